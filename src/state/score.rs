use crate::types::*;
use std::collections::BTreeMap;

/// Apply a judgment to the players and return the round's losers.
///
/// A voter loses exactly when their vote differs from the judged result.
/// Every eligible voter must already hold a vote; callers fill gaps first.
pub fn score_judgment(
    players: &mut [Player],
    votes: &BTreeMap<PlayerId, bool>,
    groom_correct: bool,
    config: &GameConfig,
) -> Vec<PlayerId> {
    let mut losers = Vec::new();

    for player in players.iter_mut() {
        if player.is_groom {
            if groom_correct {
                player.score += config.groom_correct_reward;
            } else if config.groom_drinks_when_wrong {
                player.drinks += 1;
            }
            continue;
        }

        match votes.get(&player.id) {
            Some(vote) if *vote == groom_correct => {
                player.score += config.correct_vote_reward;
            }
            _ => {
                player.drinks += 1;
                losers.push(player.id.clone());
            }
        }
    }

    losers
}

/// Players ranked by score, then fewest drinks, then name
pub fn standings(players: &[Player]) -> Vec<Player> {
    let mut ranked = players.to_vec();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.drinks.cmp(&b.drinks))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}
