use super::{AppState, IgnoreReason, Reconciled, RoundEvent, TransitionError};
use crate::types::*;

impl AppState {
    /// The groom's free-text answer; ends GROOM_ANSWERING early
    pub async fn groom_answer(&self, answer: String) -> Reconciled {
        let mut session = self.session.write().await;
        let result = self
            .dispatch_locked(&mut session, RoundEvent::GroomAnswered(answer))
            .await;
        reconcile(result, "groom answer")
    }

    pub async fn select_victim(&self, victim_id: PlayerId) -> Reconciled {
        let mut session = self.session.write().await;
        let result = self
            .dispatch_locked(&mut session, RoundEvent::VictimSelected(victim_id))
            .await;
        reconcile(result, "victim selection")
    }
}

fn reconcile(result: Result<(), TransitionError>, what: &str) -> Reconciled {
    match result {
        Ok(()) => Reconciled::Applied,
        Err(TransitionError::NotALoser(id)) => {
            tracing::warn!("Rejected {}: {} is not a round loser", what, id);
            Reconciled::Ignored(IgnoreReason::NotALoser)
        }
        Err(TransitionError::WrongStage { .. }) => {
            tracing::debug!("Dropping {}: no game running", what);
            Reconciled::Ignored(IgnoreReason::NotPlaying)
        }
        Err(e) => {
            tracing::debug!("Dropping {}: {}", what, e);
            Reconciled::Ignored(IgnoreReason::WrongPhase)
        }
    }
}
