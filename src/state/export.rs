//! Session export/import for restoring a game mid-party.
//!
//! The export is the complete host copy, host-only fields included. The
//! phase countdown is runtime-only and is rebuilt from `timeLeft` on import.

use super::{round, AppState};
use crate::protocol::SessionPatch;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::time::Instant;

/// Schema version for export format compatibility
/// Version 2: added missions, activeMission and groomCorrectCount
pub const EXPORT_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Export schema version {found} is newer than supported version {supported}. Please update the host.")]
    FutureSchema { found: u32, supported: u32 },
    #[error("Question index {index} out of range for {len} questions")]
    QuestionIndex { index: usize, len: usize },
    #[error("Selected victim '{0}' is not among the round losers")]
    VictimNotALoser(PlayerId),
    #[error("Export contains {0} grooms, at most one is allowed")]
    TooManyGrooms(usize),
    #[error("Duplicate player id '{0}'")]
    DuplicatePlayer(PlayerId),
    #[error("Failed to read or write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed export: {0}")]
    Json(#[from] serde_json::Error),
}

/// A serializable snapshot of the whole host session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub session: Session,
}

impl SessionExport {
    pub fn new(session: Session) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            session,
        }
    }

    /// Validate the export before import
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(ImportError::FutureSchema {
                found: self.schema_version,
                supported: EXPORT_SCHEMA_VERSION,
            });
        }

        let session = &self.session;

        // Past the last question is only valid once the game is over
        let len = session.questions.len();
        let index = session.current_question_index;
        let index_ok = match session.stage {
            GameStage::Playing => index < len,
            _ => index <= len,
        };
        if !index_ok {
            return Err(ImportError::QuestionIndex { index, len });
        }

        if let Some(ref victim) = session.selected_victim_id {
            if !session.is_loser(victim) {
                return Err(ImportError::VictimNotALoser(victim.clone()));
            }
        }

        let grooms = session.players.iter().filter(|p| p.is_groom).count();
        if grooms > 1 {
            return Err(ImportError::TooManyGrooms(grooms));
        }

        for (i, player) in session.players.iter().enumerate() {
            if session.players[..i].iter().any(|p| p.id == player.id) {
                return Err(ImportError::DuplicatePlayer(player.id.clone()));
            }
        }

        Ok(())
    }
}

/// What a client persists so it can come back after a reload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeHint {
    pub my_player_id: Option<PlayerId>,
    #[serde(default)]
    pub is_host: bool,
    /// Last-known snapshot, including gameCode
    #[serde(flatten)]
    pub snapshot: SessionPatch,
}

impl AppState {
    pub async fn export_state(&self) -> SessionExport {
        SessionExport::new(self.get_session().await)
    }

    /// Replace the current session with an export and broadcast it
    pub async fn import_state(&self, export: SessionExport) -> Result<(), ImportError> {
        export.validate()?;

        let mut session = self.session.write().await;
        let version = session.version;

        *session = export.session;
        session.is_host = true;
        // Clients compare versions, so never go backwards
        session.version = session.version.max(version);
        round::restore_countdown(&mut session, &self.config, Instant::now());

        tracing::info!(
            "Imported session {:?} at {:?}/{:?} with {} players",
            session.game_code,
            session.stage,
            session.round_phase,
            session.players.len()
        );
        self.commit(&mut session);
        Ok(())
    }

    /// Re-enter hosting from a persisted hint instead of a full export.
    /// Host-only media references are not part of a hint and stay empty.
    pub async fn resume_from_hint(&self, hint: ResumeHint) -> Result<(), ImportError> {
        let mut session = Session::default();
        session.merge(hint.snapshot);
        self.import_state(SessionExport::new(session)).await
    }

    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ImportError> {
        let export = self.export_state().await;
        let json = serde_json::to_string_pretty(&export)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load_from_file(&self, path: impl AsRef<Path>) -> Result<(), ImportError> {
        let json = tokio::fs::read_to_string(path).await?;
        let export: SessionExport = serde_json::from_str(&json)?;
        self.import_state(export).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JoinPayload;
    use crate::state::RoundEvent;

    fn session_with(players: Vec<Player>) -> Session {
        Session {
            game_code: Some("ABCDE".to_string()),
            stage: GameStage::Lobby,
            players,
            ..Session::default()
        }
    }

    #[test]
    fn test_export_serialization_roundtrip() {
        let mut groom = Player::new("a", "Avi");
        groom.is_groom = true;
        let export = SessionExport::new(session_with(vec![groom]));

        let json = serde_json::to_string_pretty(&export).unwrap();
        assert!(json.contains("\"schemaVersion\""));
        let parsed: SessionExport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(parsed.session, export.session);
    }

    #[test]
    fn test_validation_future_schema() {
        let mut export = SessionExport::new(Session::default());
        export.schema_version = EXPORT_SCHEMA_VERSION + 1;

        let result = export.validate();
        assert!(matches!(result, Err(ImportError::FutureSchema { .. })));
        assert!(result.unwrap_err().to_string().contains("newer than supported"));
    }

    #[test]
    fn test_validation_rejects_inconsistent_sessions() {
        let mut groom_a = Player::new("a", "Avi");
        groom_a.is_groom = true;
        let mut groom_b = Player::new("b", "Bea");
        groom_b.is_groom = true;
        let export = SessionExport::new(session_with(vec![groom_a, groom_b]));
        assert!(matches!(
            export.validate(),
            Err(ImportError::TooManyGrooms(2))
        ));

        let mut session = session_with(vec![Player::new("a", "Avi")]);
        session.selected_victim_id = Some("a".to_string());
        assert!(matches!(
            SessionExport::new(session).validate(),
            Err(ImportError::VictimNotALoser(_))
        ));

        let mut session = session_with(vec![Player::new("a", "Avi")]);
        session.stage = GameStage::Playing;
        assert!(matches!(
            SessionExport::new(session).validate(),
            Err(ImportError::QuestionIndex { index: 0, len: 0 })
        ));

        let session = session_with(vec![Player::new("a", "Avi"), Player::new("a", "Avi")]);
        assert!(matches!(
            SessionExport::new(session).validate(),
            Err(ImportError::DuplicatePlayer(_))
        ));
    }

    #[tokio::test]
    async fn test_file_roundtrip_restores_running_countdown() {
        let state = AppState::with_seed(4);
        state
            .host_game(Deck {
                questions: vec![QAPair {
                    id: "q1".to_string(),
                    video_id: "v".to_string(),
                    question: "Ever been arrested?".to_string(),
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
        state
            .join(JoinPayload {
                id: "a".to_string(),
                name: "Avi".to_string(),
                is_groom: true,
                photo: None,
            })
            .await;
        state.start_game().await.unwrap();
        state
            .dispatch(RoundEvent::PlaybackEnded(Segment::Question))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        state.save_to_file(&path).await.unwrap();

        let restored = AppState::new();
        restored.load_from_file(&path).await.unwrap();
        let session = restored.get_session().await;

        assert_eq!(session.round_phase, RoundPhase::GroomAnswering);
        assert_eq!(session.players.len(), 1);
        assert!(session.countdown.is_some());
        assert_eq!(session.time_left, Some(restored.config.groom_answer_seconds));
        assert!(session.version > 0);
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"schemaVersion\": 1").unwrap();

        let state = AppState::new();
        let result = state.load_from_file(&path).await;
        assert!(matches!(result, Err(ImportError::Json(_))));
        assert_eq!(state.get_session().await.version, 0);
    }

    #[tokio::test]
    async fn test_host_resumes_from_hint_and_rejoin_keeps_tallies() {
        let mut me = Player::new("p1", "Avi");
        me.score = 20;
        me.drinks = 3;
        let hint = ResumeHint {
            my_player_id: None,
            is_host: true,
            snapshot: SessionPatch {
                game_code: Some(Some("HJK23".to_string())),
                version: Some(17),
                stage: Some(GameStage::Lobby),
                players: Some(vec![me]),
                ..SessionPatch::default()
            },
        };

        let state = AppState::new();
        state.resume_from_hint(hint).await.unwrap();
        state
            .join(JoinPayload {
                id: "p1".to_string(),
                name: "Avi".to_string(),
                is_groom: false,
                photo: None,
            })
            .await;

        let session = state.get_session().await;
        assert_eq!(session.game_code.as_deref(), Some("HJK23"));
        assert!(session.is_host);
        assert!(session.version > 17);
        assert_eq!(session.players.len(), 1);
        assert_eq!(session.players[0].score, 20);
        assert_eq!(session.players[0].drinks, 3);
    }

    #[test]
    fn test_resume_hint_flattens_snapshot() {
        let json = r#"{"myPlayerId":"p7","isHost":false,"gameCode":"XYZ23","roundPhase":"VOTING"}"#;
        let hint: ResumeHint = serde_json::from_str(json).unwrap();

        assert_eq!(hint.my_player_id.as_deref(), Some("p7"));
        assert_eq!(hint.snapshot.game_code, Some(Some("XYZ23".to_string())));
        assert_eq!(hint.snapshot.round_phase, Some(RoundPhase::Voting));
    }
}
