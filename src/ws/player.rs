//! Player message handlers
//!
//! Inputs from player connections. None of them is ever answered: a late or
//! invalid input is dropped and the next STATE_UPDATE tells the client where
//! the round really is.

use crate::protocol::{JoinPayload, ServerMessage};
use crate::state::{AppState, Reconciled};
use crate::types::PlayerId;
use std::sync::Arc;

pub async fn handle_join(state: &Arc<AppState>, payload: JoinPayload) -> Option<ServerMessage> {
    tracing::info!("Join request from {} ({})", payload.name, payload.id);
    state.join(payload).await;
    None
}

pub async fn handle_vote(
    state: &Arc<AppState>,
    player_id: PlayerId,
    vote: bool,
) -> Option<ServerMessage> {
    if let Reconciled::Ignored(reason) = state.vote(player_id, vote).await {
        tracing::debug!("Vote ignored: {:?}", reason);
    }
    None
}

pub async fn handle_groom_answer(state: &Arc<AppState>, answer: String) -> Option<ServerMessage> {
    tracing::info!("Groom answered: {}", answer);
    if let Reconciled::Ignored(reason) = state.groom_answer(answer).await {
        tracing::debug!("Groom answer ignored: {:?}", reason);
    }
    None
}

pub async fn handle_select_victim(
    state: &Arc<AppState>,
    victim_id: PlayerId,
) -> Option<ServerMessage> {
    tracing::info!("Groom picked victim: {}", victim_id);
    if let Reconciled::Ignored(reason) = state.select_victim(victim_id).await {
        tracing::debug!("Victim selection ignored: {:?}", reason);
    }
    None
}
