//! Synthetic players for rehearsals and thin crowds.
//!
//! Bots are ordinary message producers: the planner looks at the committed
//! session and emits the same client messages a human would send, and the
//! driver feeds them through the regular dispatch path after a delay.

use crate::protocol::ClientMessage;
use crate::state::{round, AppState};
use crate::types::*;
use crate::ws::handlers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const BOT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub struct BotAction {
    pub delay: Duration,
    pub message: ClientMessage,
}

/// Remembers which bots already acted in the phase currently on screen.
///
/// Forgets everything when the phase changes or the game leaves PLAYING, so
/// a reset replaying question 0 gets fresh plans.
#[derive(Debug, Default)]
pub struct BotPlanner {
    current: Option<(usize, RoundPhase)>,
    scheduled: HashSet<PlayerId>,
}

impl BotPlanner {
    pub fn plan<R: Rng + ?Sized>(
        &mut self,
        session: &Session,
        config: &GameConfig,
        rng: &mut R,
    ) -> Vec<BotAction> {
        if session.stage != GameStage::Playing {
            self.current = None;
            self.scheduled.clear();
            return Vec::new();
        }
        if session.is_paused {
            return Vec::new();
        }

        let index = session.current_question_index;
        let phase = session.round_phase;
        if self.current != Some((index, phase)) {
            self.current = Some((index, phase));
            self.scheduled.clear();
        }

        let groom_bot = session.groom().filter(|g| g.is_bot);
        let mut actions = Vec::new();

        match phase {
            RoundPhase::GroomAnswering => {
                if let Some(groom) = groom_bot {
                    if session.groom_answer.is_none()
                        && self.scheduled.insert(groom.id.clone())
                    {
                        let answer = if rng.random_bool(0.5) { "yes" } else { "no" };
                        actions.push(BotAction {
                            delay: delay(config, rng),
                            message: ClientMessage::GroomAnswer {
                                answer: answer.to_string(),
                            },
                        });
                    }
                }
            }
            RoundPhase::Voting => {
                let voters: Vec<PlayerId> = session
                    .players
                    .iter()
                    .filter(|p| p.is_bot && !p.is_groom)
                    .filter(|p| !session.current_votes.contains_key(&p.id))
                    .map(|p| p.id.clone())
                    .collect();
                for id in voters {
                    if self.scheduled.insert(id.clone()) {
                        actions.push(BotAction {
                            delay: delay(config, rng),
                            message: ClientMessage::Vote {
                                player_id: id,
                                vote: rng.random_bool(0.5),
                            },
                        });
                    }
                }
            }
            RoundPhase::VictimSelection => {
                if let Some(groom) = groom_bot {
                    if self.scheduled.insert(groom.id.clone()) {
                        if let Some(victim_id) = round::pick_victim(session, rng) {
                            actions.push(BotAction {
                                delay: delay(config, rng),
                                message: ClientMessage::GroomSelectVictim { victim_id },
                            });
                        }
                    }
                }
            }
            _ => {}
        }

        actions
    }
}

fn delay<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Duration {
    let lo = config.bot_min_delay_ms.min(config.bot_max_delay_ms);
    let hi = config.bot_min_delay_ms.max(config.bot_max_delay_ms);
    Duration::from_millis(rng.random_range(lo..=hi))
}

/// Spawn a background task that plays every `isBot` player
pub fn spawn_bot_driver(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut planner = BotPlanner::default();
        let mut rng = match state.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        let mut interval = tokio::time::interval(BOT_POLL_INTERVAL);

        loop {
            interval.tick().await;
            let session = state.get_session().await;

            for action in planner.plan(&session, &state.config, &mut rng) {
                let state = state.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(action.delay).await;
                    tracing::debug!("Bot sends {:?}", action.message);
                    handlers::handle_message(action.message, &Role::Player, &state).await;
                });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JoinPayload;
    use crate::state::RoundEvent;

    fn bot(id: &str, groom: bool) -> Player {
        let mut player = Player::new(id, id);
        player.is_bot = true;
        player.is_groom = groom;
        player
    }

    fn playing(phase: RoundPhase, players: Vec<Player>) -> Session {
        Session {
            stage: GameStage::Playing,
            round_phase: phase,
            players,
            ..Session::default()
        }
    }

    #[test]
    fn test_bots_vote_once_per_question() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut planner = BotPlanner::default();
        let session = playing(
            RoundPhase::Voting,
            vec![bot("g", true), bot("b1", false), Player::new("h", "Human")],
        );

        let actions = planner.plan(&session, &config, &mut rng);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0].message,
            ClientMessage::Vote { player_id, .. } if player_id == "b1"
        ));
        let ms = actions[0].delay.as_millis() as u64;
        assert!((config.bot_min_delay_ms..=config.bot_max_delay_ms).contains(&ms));

        assert!(planner.plan(&session, &config, &mut rng).is_empty());

        let mut next = session.clone();
        next.current_question_index = 1;
        assert_eq!(planner.plan(&next, &config, &mut rng).len(), 1);
    }

    #[test]
    fn test_bots_act_again_after_reset() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut planner = BotPlanner::default();
        let voting = playing(RoundPhase::Voting, vec![bot("b1", false)]);
        assert_eq!(planner.plan(&voting, &config, &mut rng).len(), 1);

        let summary = Session {
            stage: GameStage::Summary,
            ..voting.clone()
        };
        assert!(planner.plan(&summary, &config, &mut rng).is_empty());

        // Same question index and phase in the replayed game
        assert_eq!(planner.plan(&voting, &config, &mut rng).len(), 1);

        // A reset and restart seen only as a new phase of question 0
        let question = playing(RoundPhase::Question, vec![bot("b1", false)]);
        assert!(planner.plan(&question, &config, &mut rng).is_empty());
        assert_eq!(planner.plan(&voting, &config, &mut rng).len(), 1);
    }

    #[test]
    fn test_groom_bot_answers_and_picks_a_loser() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut planner = BotPlanner::default();

        let answering = playing(RoundPhase::GroomAnswering, vec![bot("g", true)]);
        let actions = planner.plan(&answering, &config, &mut rng);
        assert!(matches!(
            actions.as_slice(),
            [BotAction {
                message: ClientMessage::GroomAnswer { .. },
                ..
            }]
        ));

        let mut selecting = playing(
            RoundPhase::VictimSelection,
            vec![bot("g", true), Player::new("l", "Loser")],
        );
        selecting.round_losers = vec!["l".to_string()];
        let actions = planner.plan(&selecting, &config, &mut rng);
        assert_eq!(
            actions[0].message,
            ClientMessage::GroomSelectVictim {
                victim_id: "l".to_string()
            }
        );
    }

    #[test]
    fn test_no_plans_while_paused_or_for_human_groom() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut planner = BotPlanner::default();

        let mut paused = playing(RoundPhase::Voting, vec![bot("b1", false)]);
        paused.is_paused = true;
        assert!(planner.plan(&paused, &config, &mut rng).is_empty());

        let human_groom = playing(
            RoundPhase::GroomAnswering,
            vec![Player {
                is_groom: true,
                ..Player::new("h", "Human")
            }],
        );
        assert!(planner.plan(&human_groom, &config, &mut rng).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_driver_finishes_voting() {
        let state = Arc::new(AppState::with_seed(8));
        state
            .host_game(Deck {
                questions: vec![QAPair {
                    id: "q1".to_string(),
                    video_id: "v".to_string(),
                    question: "Does he snore?".to_string(),
                    answer: "yes".to_string(),
                    q_start: 0.0,
                    q_end: 2.0,
                    a_start: 2.0,
                    a_end: 4.0,
                }],
                ..Deck::default()
            })
            .await
            .unwrap();
        state
            .join(JoinPayload {
                id: "g".to_string(),
                name: "Groom".to_string(),
                is_groom: true,
                photo: None,
            })
            .await;
        state.add_bots(2, false).await;
        state.start_game().await.unwrap();
        state
            .dispatch(RoundEvent::PlaybackEnded(Segment::Question))
            .await
            .unwrap();
        state.groom_answer("yes".to_string()).await;

        spawn_bot_driver(state.clone());
        tokio::time::sleep(Duration::from_millis(state.config.bot_max_delay_ms + 500)).await;

        let session = state.get_session().await;
        assert_eq!(session.round_phase, RoundPhase::Reveal);
        assert_eq!(session.current_votes.len(), 2);
    }
}
