use super::AppState;
use crate::protocol::{JoinPayload, ServerMessage};
use crate::types::*;

/// Outcome of folding a client input into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Applied,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The input belongs to a phase the round has already left (or not reached)
    WrongPhase,
    /// No game is running
    NotPlaying,
    UnknownPlayer,
    GroomCannotVote,
    NotALoser,
}

impl Reconciled {
    pub fn is_applied(&self) -> bool {
        matches!(self, Reconciled::Applied)
    }
}

impl AppState {
    /// Idempotent upsert keyed by the client's player id.
    ///
    /// A returning player keeps score, drinks and bot flag. Claiming the groom
    /// role takes it away from whoever held it.
    pub async fn join(&self, payload: JoinPayload) -> Reconciled {
        let mut session = self.session.write().await;
        let JoinPayload {
            id,
            name,
            is_groom,
            photo,
        } = payload;

        if is_groom {
            for other in session.players.iter_mut().filter(|p| p.id != id) {
                if other.is_groom {
                    tracing::info!("Groom role moves from {} to {}", other.id, id);
                    other.is_groom = false;
                }
            }
            // A groom never has a vote on record
            session.current_votes.remove(&id);
        }

        match session.player_mut(&id) {
            Some(existing) => {
                tracing::info!("Player {} ({}) rejoined", name, id);
                existing.name = name;
                existing.is_groom = is_groom;
                if photo.is_some() {
                    existing.photo = photo;
                }
            }
            None => {
                tracing::info!("Player {} ({}) joined", name, id);
                let mut player = Player::new(id, name);
                player.is_groom = is_groom;
                player.photo = photo;
                session.players.push(player);
            }
        }

        self.commit(&mut session);
        Reconciled::Applied
    }

    /// Explicit removal of a player; the only way a player leaves `players`
    pub async fn kick(&self, player_id: &str) -> Reconciled {
        let mut session = self.session.write().await;
        let before = session.players.len();
        session.players.retain(|p| p.id != player_id);
        if session.players.len() == before {
            return Reconciled::Ignored(IgnoreReason::UnknownPlayer);
        }
        session.current_votes.remove(player_id);

        tracing::info!("Kicked player {}", player_id);
        self.commit(&mut session);
        let _ = self.broadcast.send(ServerMessage::Kick {
            player_id: player_id.to_string(),
        });

        // The kicked player may have been the last one we were waiting on
        self.advance_if_all_voted(&mut session).await;
        Reconciled::Applied
    }

    /// Add synthetic players driven by the bot driver
    pub async fn add_bots(&self, count: u32, as_groom: bool) -> Vec<Player> {
        let mut session = self.session.write().await;
        let mut added = Vec::new();

        for n in 0..count {
            let name = petname::petname(2, " ")
                .unwrap_or_else(|| format!("Bot {}", session.players.len() + 1));
            let mut bot = Player::new(ulid::Ulid::new().to_string(), name);
            bot.is_bot = true;
            if as_groom && n == 0 {
                for other in session.players.iter_mut() {
                    other.is_groom = false;
                }
                bot.is_groom = true;
            }
            session.players.push(bot.clone());
            added.push(bot);
        }

        if !added.is_empty() {
            tracing::info!("Added {} bots", added.len());
            self.commit(&mut session);
        }
        added
    }
}
