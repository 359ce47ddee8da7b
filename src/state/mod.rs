pub mod export;
mod game;
mod groom;
mod player;
pub mod round;
pub mod score;
mod vote;

pub use player::{IgnoreReason, Reconciled};
pub use round::{RoundEvent, TransitionError};

use crate::broadcast::snapshot_for_clients;
use crate::protocol::{ServerMessage, SessionPatch};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub config: Arc<GameConfig>,
    /// Broadcast channel for sending messages to all clients
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Broadcast channel for sending messages to host-role connections only
    pub host_broadcast: broadcast::Sender<ServerMessage>,
    /// Source for auto-votes, auto-picks and mission draws
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (tx, _rx) = broadcast::channel(100);
        let (host_tx, _host_rx) = broadcast::channel(100);

        Self {
            session: Arc::new(RwLock::new(Session {
                is_host: true,
                ..Session::default()
            })),
            config: Arc::new(config),
            broadcast: tx,
            host_broadcast: host_tx,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Deterministic randomness for replays and tests
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(GameConfig {
            rng_seed: Some(seed),
            ..GameConfig::default()
        })
    }

    pub async fn get_session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// The sanitized view a newly connected client starts from
    pub async fn client_snapshot(&self) -> SessionPatch {
        snapshot_for_clients(&*self.session.read().await)
    }

    /// Merge a partial field-set into the session and broadcast the result
    pub async fn apply_update(&self, patch: SessionPatch) -> Session {
        let mut session = self.session.write().await;
        session.merge(patch);
        session.is_host = true;
        self.commit(&mut session);
        session.clone()
    }

    /// Bump the version and fan the new snapshot out.
    ///
    /// Must be called while the session write lock is held so no client can
    /// observe a mutation that was never sent.
    pub(crate) fn commit(&self, session: &mut Session) {
        session.version += 1;
        tracing::debug!(
            "Committed v{} ({:?}/{:?})",
            session.version,
            session.stage,
            session.round_phase
        );

        // Ignore send errors (no receivers connected is fine)
        let _ = self
            .broadcast
            .send(ServerMessage::StateUpdate(snapshot_for_clients(session)));

        if session.stage == GameStage::Playing && session.round_phase == RoundPhase::Voting {
            let _ = self.host_broadcast.send(vote::tally(session));
        }
    }

    /// Run one round event against the current session
    pub async fn dispatch(&self, event: RoundEvent) -> Result<Session, TransitionError> {
        let mut session = self.session.write().await;
        self.dispatch_locked(&mut session, event).await?;
        Ok(session.clone())
    }

    /// Same as `dispatch` for callers already holding the write lock
    pub(crate) async fn dispatch_locked(
        &self,
        session: &mut Session,
        event: RoundEvent,
    ) -> Result<(), TransitionError> {
        let now = Instant::now();
        let next = {
            let mut rng = self.rng.lock().await;
            round::transition(session, event, &self.config, now, &mut *rng)?
        };

        let entered_summary =
            session.stage != GameStage::Summary && next.stage == GameStage::Summary;
        tracing::info!(
            "Round {}: {:?} -> {:?}",
            session.current_question_index,
            session.round_phase,
            next.round_phase
        );

        *session = next;
        self.commit(session);

        if entered_summary {
            tracing::info!("Game over, sending standings");
            let _ = self.broadcast.send(ServerMessage::Standings {
                players: score::standings(&session.players),
            });
        }
        Ok(())
    }

    /// Advance the active countdown by one tick.
    ///
    /// Publishes the visible counter when it changes and fires the phase's
    /// expiry transition once the countdown runs out.
    pub async fn tick(&self) {
        let mut session = self.session.write().await;
        if session.is_paused {
            return;
        }
        let Some(countdown) = session.countdown else {
            return;
        };

        let now = Instant::now();
        if countdown.is_expired(now) {
            let phase = session.round_phase;
            match self.dispatch_locked(&mut session, RoundEvent::TimerExpired).await {
                Ok(()) => tracing::info!("{:?} timer expired", phase),
                Err(e) => tracing::warn!("Timer expiry rejected: {}", e),
            }
            return;
        }

        let secs = countdown.remaining_secs(now);
        if session.time_left != Some(secs) {
            session.time_left = Some(secs);
            self.commit(&mut session);
        }
    }

    /// Freeze or resume every countdown without losing elapsed time
    pub async fn set_paused(&self, paused: bool) -> Session {
        let mut session = self.session.write().await;
        if session.is_paused == paused {
            return session.clone();
        }

        let now = Instant::now();
        session.is_paused = paused;
        if let Some(countdown) = session.countdown.as_mut() {
            if paused {
                countdown.pause(now);
            } else {
                countdown.resume(now);
            }
        }
        session.time_left = session.countdown.map(|c| c.remaining_secs(now));
        tracing::info!("Game {}", if paused { "paused" } else { "resumed" });
        self.commit(&mut session);

        // Votes that completed during the pause advance now
        if !paused {
            self.advance_if_all_voted(&mut session).await;
        }
        session.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
