use crate::protocol::SessionPatch;
use crate::state::AppState;
use crate::types::Session;
use std::sync::Arc;
use std::time::Duration;

/// Countdown resolution shown to players
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// The copy of `session` that leaves the host.
///
/// Host-only media references are stripped and `isHost` is forced off so no
/// client ever believes itself authoritative.
pub fn snapshot_for_clients(session: &Session) -> SessionPatch {
    let mut patch = SessionPatch::full(session);
    patch.is_host = Some(false);
    patch
}

/// Spawn a background task that drives the phase countdown once per tick
pub fn spawn_phase_ticker(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            state.tick().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JoinPayload, ServerMessage};
    use crate::state::RoundEvent;
    use crate::types::*;

    #[test]
    fn test_snapshot_strips_host_fields() {
        let mut session = Session {
            is_host: true,
            ..Session::default()
        };
        session
            .videos
            .insert("clip".to_string(), "/media/clip.mp4".to_string());

        let patch = snapshot_for_clients(&session);
        assert_eq!(patch.is_host, Some(false));

        let json = serde_json::to_string(&patch).unwrap();
        assert!(!json.contains("videos"));
        assert!(!json.contains("/media/clip.mp4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_ticker_expires_groom_answering() {
        let state = Arc::new(AppState::with_seed(2));
        state
            .host_game(Deck {
                questions: vec![QAPair {
                    id: "q1".to_string(),
                    video_id: "v".to_string(),
                    question: "Can he cook?".to_string(),
                    answer: "no".to_string(),
                    q_start: 0.0,
                    q_end: 2.0,
                    a_start: 2.0,
                    a_end: 4.0,
                }],
                ..Deck::default()
            })
            .await
            .unwrap();
        for (id, groom) in [("a", true), ("b", false)] {
            state
                .join(JoinPayload {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    is_groom: groom,
                    photo: None,
                })
                .await;
        }
        state.start_game().await.unwrap();
        state
            .dispatch(RoundEvent::PlaybackEnded(Segment::Question))
            .await
            .unwrap();

        let mut rx = state.broadcast.subscribe();
        spawn_phase_ticker(state.clone());

        // The paused clock auto-advances while every task sleeps
        tokio::time::sleep(Duration::from_secs(
            u64::from(state.config.groom_answer_seconds) + 2,
        ))
        .await;

        let session = state.get_session().await;
        assert_eq!(session.round_phase, RoundPhase::Voting);
        assert!(session.groom_answer.is_none());

        let mut seen_countdown = false;
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::StateUpdate(patch) = msg {
                if patch.round_phase == Some(RoundPhase::GroomAnswering)
                    && patch.time_left == Some(Some(10))
                {
                    seen_countdown = true;
                }
            }
        }
        assert!(seen_countdown);
    }
}
