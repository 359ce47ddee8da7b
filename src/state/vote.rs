use super::{AppState, IgnoreReason, Reconciled, RoundEvent};
use crate::protocol::ServerMessage;
use crate::types::*;

/// Live yes/no counts for the operator screen
pub(crate) fn tally(session: &Session) -> ServerMessage {
    let yes = session.current_votes.values().filter(|v| **v).count() as u32;
    let no = session.current_votes.len() as u32 - yes;
    ServerMessage::HostVoteTally {
        yes,
        no,
        outstanding: session.missing_voters().len() as u32,
    }
}

impl AppState {
    /// Record or overwrite a player's prediction.
    ///
    /// The write itself never changes phase; the all-voted check runs as a
    /// separate transition afterwards.
    pub async fn vote(&self, player_id: PlayerId, vote: bool) -> Reconciled {
        let mut session = self.session.write().await;

        if session.stage != GameStage::Playing {
            return Reconciled::Ignored(IgnoreReason::NotPlaying);
        }
        if session.round_phase != RoundPhase::Voting {
            tracing::debug!(
                "Late vote from {} during {:?}, dropping",
                player_id,
                session.round_phase
            );
            return Reconciled::Ignored(IgnoreReason::WrongPhase);
        }
        match session.player(&player_id) {
            None => {
                tracing::warn!("Vote from unknown player {}", player_id);
                return Reconciled::Ignored(IgnoreReason::UnknownPlayer);
            }
            Some(p) if p.is_groom => {
                tracing::warn!("Groom {} tried to vote", player_id);
                return Reconciled::Ignored(IgnoreReason::GroomCannotVote);
            }
            Some(_) => {}
        }

        tracing::info!("Vote from {}: {}", player_id, vote);
        session.current_votes.insert(player_id, vote);
        self.commit(&mut session);

        self.advance_if_all_voted(&mut session).await;
        Reconciled::Applied
    }

    /// Current counts without waiting for the next commit
    pub async fn vote_tally(&self) -> ServerMessage {
        tally(&*self.session.read().await)
    }

    pub(crate) async fn advance_if_all_voted(&self, session: &mut Session) {
        if session.stage != GameStage::Playing
            || session.round_phase != RoundPhase::Voting
            || session.is_paused
            || !session.missing_voters().is_empty()
        {
            return;
        }
        if let Err(e) = self.dispatch_locked(session, RoundEvent::AllVotesIn).await {
            tracing::debug!("All-voted check did not advance: {}", e);
        }
    }
}
