use super::{round, score, AppState, TransitionError};
use crate::types::*;
use rand::Rng;
use tokio::time::Instant;

/// Safe character set for short codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random short code (5 characters)
fn generate_short_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// SETUP -> LOBBY: load the deck and open the game under a fresh code
    pub async fn host_game(&self, deck: Deck) -> Result<Session, TransitionError> {
        let mut session = self.session.write().await;
        if session.stage != GameStage::Setup {
            return Err(TransitionError::WrongStage {
                expected: GameStage::Setup,
                actual: session.stage,
            });
        }

        let code = generate_short_code();
        tracing::info!(
            "Hosting game {} with {} questions and {} missions",
            code,
            deck.questions.len(),
            deck.missions.len()
        );

        session.game_code = Some(code);
        session.questions = deck.questions;
        session.missions = deck.missions;
        session.videos = deck.videos;
        session.stage = GameStage::Lobby;
        session.is_host = true;

        self.commit(&mut session);
        Ok(session.clone())
    }

    /// LOBBY -> PLAYING on the first question
    pub async fn start_game(&self) -> Result<Session, TransitionError> {
        let mut session = self.session.write().await;
        let next = round::start_game(&session, &self.config, Instant::now())?;
        tracing::info!(
            "Game started with {} players and {} questions",
            next.players.len(),
            next.questions.len()
        );

        *session = next;
        self.commit(&mut session);
        Ok(session.clone())
    }

    /// Back to LOBBY with the same roster and deck, every tally zeroed
    pub async fn reset_game(&self) -> Session {
        let mut session = self.session.write().await;
        tracing::info!("Resetting game {:?}", session.game_code);

        if session.stage != GameStage::Setup {
            session.stage = GameStage::Lobby;
        }
        session.round_phase = RoundPhase::Question;
        session.current_question_index = 0;
        session.current_votes.clear();
        session.groom_answer = None;
        session.groom_result = None;
        session.groom_correct_count = 0;
        session.round_losers.clear();
        session.selected_victim_id = None;
        session.past_victims.clear();
        session.active_mission = None;
        session.is_paused = false;
        session.countdown = None;
        session.time_left = None;
        for player in session.players.iter_mut() {
            player.score = 0;
            player.drinks = 0;
        }

        self.commit(&mut session);
        session.clone()
    }

    /// Current ranking: score, then fewest drinks, then name
    pub async fn standings(&self) -> Vec<Player> {
        score::standings(&self.session.read().await.players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JoinPayload;
    use crate::state::RoundEvent;

    fn deck(questions: usize) -> Deck {
        Deck {
            questions: (0..questions)
                .map(|i| QAPair {
                    id: format!("q{}", i),
                    video_id: "v".to_string(),
                    question: "Would he?".to_string(),
                    answer: "no".to_string(),
                    q_start: 0.0,
                    q_end: 1.0,
                    a_start: 1.0,
                    a_end: 2.0,
                })
                .collect(),
            ..Deck::default()
        }
    }

    #[test]
    fn test_short_code_alphabet() {
        for _ in 0..50 {
            let code = generate_short_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_host_game_opens_lobby_once() {
        let state = AppState::new();
        let session = state.host_game(deck(2)).await.unwrap();

        assert_eq!(session.stage, GameStage::Lobby);
        assert_eq!(session.questions.len(), 2);
        assert!(session.game_code.is_some());
        assert!(session.is_host);

        let again = state.host_game(deck(1)).await;
        assert!(matches!(again, Err(TransitionError::WrongStage { .. })));
        assert_eq!(state.get_session().await.questions.len(), 2);
    }

    #[tokio::test]
    async fn test_start_game_requires_players() {
        let state = AppState::new();
        state.host_game(deck(1)).await.unwrap();

        assert_eq!(
            state.start_game().await.unwrap_err(),
            TransitionError::NoPlayers
        );

        state
            .join(JoinPayload {
                id: "p1".to_string(),
                name: "Avi".to_string(),
                is_groom: true,
                photo: None,
            })
            .await;
        let session = state.start_game().await.unwrap();
        assert_eq!(session.stage, GameStage::Playing);
        assert_eq!(session.round_phase, RoundPhase::Question);
    }

    #[tokio::test]
    async fn test_reset_keeps_roster_and_zeroes_tallies() {
        let state = AppState::with_seed(1);
        state.host_game(deck(2)).await.unwrap();
        state
            .join(JoinPayload {
                id: "p1".to_string(),
                name: "Avi".to_string(),
                is_groom: false,
                photo: None,
            })
            .await;
        state.start_game().await.unwrap();
        state
            .dispatch(RoundEvent::PlaybackEnded(Segment::Question))
            .await
            .unwrap();
        {
            let mut session = state.session.write().await;
            session.players[0].score = 15;
            session.players[0].drinks = 2;
            session.past_victims.push("p1".to_string());
            session.groom_correct_count = 1;
        }

        let session = state.reset_game().await;

        assert_eq!(session.stage, GameStage::Lobby);
        assert_eq!(session.round_phase, RoundPhase::Question);
        assert_eq!(session.players.len(), 1);
        assert_eq!(session.players[0].score, 0);
        assert_eq!(session.players[0].drinks, 0);
        assert!(session.past_victims.is_empty());
        assert_eq!(session.groom_correct_count, 0);
        assert!(session.countdown.is_none());
        assert_eq!(session.questions.len(), 2);
    }
}
