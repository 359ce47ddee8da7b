//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Authorization is checked here, then dispatched to role-specific handler modules.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{host, player};

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($role:expr, $action:expr) => {
        if *$role != Role::Host {
            tracing::warn!("Rejected host command from {:?}: {}", $role, $action);
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only host can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Player messages (fire-and-forget, never answered)
        ClientMessage::Join(payload) => player::handle_join(state, payload).await,

        ClientMessage::Vote { player_id, vote } => {
            player::handle_vote(state, player_id, vote).await
        }

        ClientMessage::GroomAnswer { answer } => {
            player::handle_groom_answer(state, answer).await
        }

        ClientMessage::GroomSelectVictim { victim_id } => {
            player::handle_select_victim(state, victim_id).await
        }

        // Host-only commands (authorization checked before dispatch)
        ClientMessage::HostStartGame => {
            check_host!(role, "start the game");
            host::handle_start_game(state).await
        }

        ClientMessage::HostPlaybackEnded { segment } => {
            check_host!(role, "report playback");
            host::handle_playback_ended(state, segment).await
        }

        ClientMessage::HostJudge { groom_correct } => {
            check_host!(role, "judge the groom");
            host::handle_judge(state, groom_correct).await
        }

        ClientMessage::HostRevealSettled => {
            check_host!(role, "settle the reveal");
            host::handle_reveal_settled(state).await
        }

        ClientMessage::HostRoundComplete => {
            check_host!(role, "complete rounds");
            host::handle_round_complete(state).await
        }

        ClientMessage::HostSetPaused { paused } => {
            check_host!(role, "pause the game");
            host::handle_set_paused(state, paused).await
        }

        ClientMessage::HostKick { player_id } => {
            check_host!(role, "kick players");
            host::handle_kick(state, player_id).await
        }

        ClientMessage::HostAddBots { count, as_groom } => {
            check_host!(role, "add bots");
            host::handle_add_bots(state, count, as_groom).await
        }

        ClientMessage::HostResetGame => {
            check_host!(role, "reset game");
            host::handle_reset_game(state).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JoinPayload;
    use crate::types::*;

    fn qa(id: &str) -> QAPair {
        QAPair {
            id: id.to_string(),
            video_id: "v".to_string(),
            question: "Has he ever been skydiving?".to_string(),
            answer: "no".to_string(),
            q_start: 0.0,
            q_end: 2.0,
            a_start: 2.0,
            a_end: 4.0,
        }
    }

    async fn hosted() -> Arc<AppState> {
        let state = Arc::new(AppState::with_seed(21));
        state
            .host_game(Deck {
                questions: vec![qa("q1")],
                ..Deck::default()
            })
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_unauthorized_host_command() {
        let state = hosted().await;
        let role = Role::Player;

        let result = handle_message(ClientMessage::HostStartGame, &role, &state).await;

        assert!(result.is_some());
        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "UNAUTHORIZED");
        }
        assert_eq!(state.get_session().await.stage, GameStage::Lobby);
    }

    #[tokio::test]
    async fn test_player_messages_get_no_reply() {
        let state = hosted().await;

        let join = ClientMessage::Join(JoinPayload {
            id: "p1".to_string(),
            name: "Avi".to_string(),
            is_groom: false,
            photo: None,
        });
        assert!(handle_message(join, &Role::Player, &state).await.is_none());

        // Wrong phase: silently dropped
        let vote = ClientMessage::Vote {
            player_id: "p1".to_string(),
            vote: true,
        };
        assert!(handle_message(vote, &Role::Player, &state).await.is_none());
        assert!(state.get_session().await.current_votes.is_empty());
    }

    #[tokio::test]
    async fn test_host_start_game_without_players_reports_error() {
        let state = hosted().await;

        let result = handle_message(ClientMessage::HostStartGame, &Role::Host, &state).await;

        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "START_FAILED"),
            other => panic!("Expected Error message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_host_add_bots_and_start() {
        let state = hosted().await;

        let result = handle_message(
            ClientMessage::HostAddBots {
                count: 2,
                as_groom: true,
            },
            &Role::Host,
            &state,
        )
        .await;
        assert!(result.is_none());

        let result = handle_message(ClientMessage::HostStartGame, &Role::Host, &state).await;
        assert!(result.is_none());

        let session = state.get_session().await;
        assert_eq!(session.stage, GameStage::Playing);
        assert_eq!(session.players.len(), 2);
        assert!(session.groom().is_some_and(|g| g.is_bot));
    }

    #[tokio::test]
    async fn test_host_command_in_wrong_phase_reports_error() {
        let state = hosted().await;
        state.add_bots(1, false).await;
        state.start_game().await.unwrap();
        let before = state.get_session().await;

        let result = handle_message(
            ClientMessage::HostJudge {
                groom_correct: true,
            },
            &Role::Host,
            &state,
        )
        .await;

        match result {
            Some(ServerMessage::Error { code, msg }) => {
                assert_eq!(code, "TRANSITION_FAILED");
                assert!(msg.contains("Judged"));
            }
            other => panic!("Expected Error message, got {:?}", other),
        }
        assert_eq!(state.get_session().await, before);
    }

    #[tokio::test]
    async fn test_reset_game() {
        let state = hosted().await;
        let role = Role::Host;

        handle_message(
            ClientMessage::HostAddBots {
                count: 3,
                as_groom: false,
            },
            &role,
            &state,
        )
        .await;
        handle_message(ClientMessage::HostStartGame, &role, &state).await;
        assert_eq!(state.get_session().await.stage, GameStage::Playing);

        let result = handle_message(ClientMessage::HostResetGame, &role, &state).await;
        assert!(result.is_none());

        let session = state.get_session().await;
        assert_eq!(session.stage, GameStage::Lobby);
        assert_eq!(session.players.len(), 3);
    }
}
