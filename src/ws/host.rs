//! Host-only command handlers
//!
//! All handlers in this module require the Host role.
//! Authorization is checked in the main dispatch layer before calling these.
//! Successful commands are answered by the STATE_UPDATE broadcast they cause;
//! only failures get a direct reply.

use crate::protocol::ServerMessage;
use crate::state::{AppState, Reconciled, RoundEvent, TransitionError};
use crate::types::{PlayerId, Segment};
use std::sync::Arc;

/// Upper bound for a single HOST_ADD_BOTS request
const MAX_BOTS_PER_REQUEST: u32 = 20;

fn transition_failed(e: TransitionError) -> Option<ServerMessage> {
    tracing::warn!("Host command rejected: {}", e);
    Some(ServerMessage::Error {
        code: "TRANSITION_FAILED".to_string(),
        msg: e.to_string(),
    })
}

async fn dispatch(state: &Arc<AppState>, event: RoundEvent) -> Option<ServerMessage> {
    match state.dispatch(event).await {
        Ok(_) => None,
        Err(e) => transition_failed(e),
    }
}

pub async fn handle_start_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Host starting game");
    match state.start_game().await {
        Ok(_) => None,
        Err(e) => Some(ServerMessage::Error {
            code: "START_FAILED".to_string(),
            msg: e.to_string(),
        }),
    }
}

pub async fn handle_playback_ended(
    state: &Arc<AppState>,
    segment: Segment,
) -> Option<ServerMessage> {
    tracing::info!("Playback ended: {:?}", segment);
    dispatch(state, RoundEvent::PlaybackEnded(segment)).await
}

pub async fn handle_judge(state: &Arc<AppState>, groom_correct: bool) -> Option<ServerMessage> {
    tracing::info!("Host judged groom correct={}", groom_correct);
    dispatch(state, RoundEvent::Judged { groom_correct }).await
}

pub async fn handle_reveal_settled(state: &Arc<AppState>) -> Option<ServerMessage> {
    dispatch(state, RoundEvent::RevealSettled).await
}

pub async fn handle_round_complete(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Host completed round");
    dispatch(state, RoundEvent::RoundComplete).await
}

pub async fn handle_set_paused(state: &Arc<AppState>, paused: bool) -> Option<ServerMessage> {
    state.set_paused(paused).await;
    None
}

pub async fn handle_kick(state: &Arc<AppState>, player_id: PlayerId) -> Option<ServerMessage> {
    tracing::info!("Host kicking player {}", player_id);
    match state.kick(&player_id).await {
        Reconciled::Applied => None,
        Reconciled::Ignored(_) => Some(ServerMessage::Error {
            code: "PLAYER_NOT_FOUND".to_string(),
            msg: format!("Player {} not found", player_id),
        }),
    }
}

pub async fn handle_add_bots(
    state: &Arc<AppState>,
    count: u32,
    as_groom: bool,
) -> Option<ServerMessage> {
    if count == 0 || count > MAX_BOTS_PER_REQUEST {
        return Some(ServerMessage::Error {
            code: "INVALID_BOT_COUNT".to_string(),
            msg: format!("Bot count must be between 1 and {}", MAX_BOTS_PER_REQUEST),
        });
    }
    tracing::info!("Host adding {} bots", count);
    state.add_bots(count, as_groom).await;
    None
}

pub async fn handle_reset_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    state.reset_game().await;
    None
}
