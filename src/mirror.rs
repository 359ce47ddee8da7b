//! Client-side read-only copy of the host session.

use crate::protocol::{ClientMessage, JoinPayload, ServerMessage, SessionPatch};
use crate::state::export::ResumeHint;
use crate::types::*;

#[derive(Debug, Clone, Default)]
pub struct ClientMirror {
    pub my_player_id: Option<PlayerId>,
    pub session: Session,
    /// Our own record as last seen, re-spliced when a snapshot leaves us out
    last_self: Option<Player>,
}

impl ClientMirror {
    pub fn new(my_player_id: impl Into<PlayerId>) -> Self {
        Self {
            my_player_id: Some(my_player_id.into()),
            ..Self::default()
        }
    }

    /// Rebuild a mirror from a persisted hint without going through SETUP
    pub fn from_resume(hint: ResumeHint) -> Self {
        let mut mirror = Self {
            my_player_id: hint.my_player_id,
            ..Self::default()
        };
        mirror.apply_snapshot(hint.snapshot);
        mirror
    }

    /// Persistable state for a later `from_resume`
    pub fn resume_hint(&self) -> ResumeHint {
        let mut snapshot = SessionPatch::full(&self.session);
        // Carried once, at the top level of the hint
        snapshot.is_host = None;
        ResumeHint {
            my_player_id: self.my_player_id.clone(),
            is_host: false,
            snapshot,
        }
    }

    /// Shallow merge of a host snapshot
    pub fn apply_snapshot(&mut self, patch: SessionPatch) {
        if let Some(incoming) = patch.version {
            if incoming < self.session.version {
                tracing::debug!(
                    "Snapshot v{} older than mirror v{}",
                    incoming,
                    self.session.version
                );
            }
        }

        self.session.merge(patch);
        self.session.is_host = false;

        let Some(me) = self.my_player_id.clone() else {
            return;
        };
        if let Some(player) = self.session.player(&me).cloned() {
            self.last_self = Some(player);
        } else if let Some(player) = self.last_self.clone() {
            tracing::debug!("Snapshot omitted own player {}, keeping last record", me);
            self.session.players.push(player);
        }
    }

    /// Fold any host message into the mirror
    pub fn apply_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::StateUpdate(patch) => self.apply_snapshot(patch),
            ServerMessage::Kick { player_id } => {
                self.session.players.retain(|p| p.id != player_id);
                if self.my_player_id.as_deref() == Some(player_id.as_str()) {
                    tracing::info!("Removed from the game by the host");
                    self.last_self = None;
                    self.my_player_id = None;
                }
            }
            ServerMessage::Standings { .. }
            | ServerMessage::HostVoteTally { .. }
            | ServerMessage::Error { .. } => {}
        }
    }

    pub fn me(&self) -> Option<&Player> {
        self.my_player_id
            .as_deref()
            .and_then(|id| self.session.player(id))
    }

    /// The JOIN to (re)send on connect; reuses the stored id so the host restores our tallies
    pub fn join_message(
        &mut self,
        name: impl Into<String>,
        is_groom: bool,
        photo: Option<String>,
    ) -> ClientMessage {
        let id = self
            .my_player_id
            .get_or_insert_with(|| ulid::Ulid::new().to_string())
            .clone();
        let name = name.into();

        // Seed our own record so the first empty snapshot cannot drop us
        if self.last_self.is_none() {
            let mut me = Player::new(id.clone(), name.clone());
            me.is_groom = is_groom;
            me.photo = photo.clone();
            self.last_self = Some(me);
        }

        ClientMessage::Join(JoinPayload {
            id,
            name,
            is_groom,
            photo,
        })
    }

    /// A rejoin for a resumed mirror, reusing the last-known name and role
    pub fn rejoin_message(&mut self) -> Option<ClientMessage> {
        let me = self.me().or(self.last_self.as_ref())?.clone();
        Some(self.join_message(me.name, me.is_groom, me.photo))
    }
}
