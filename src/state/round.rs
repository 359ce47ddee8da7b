//! Round state machine
//!
//! A pure function of (session, event) -> session. It never touches locks,
//! channels or the wall clock directly; the caller passes `now` and the
//! randomness source so every transition can be replayed.

use super::score::score_judgment;
use crate::timer::Countdown;
use crate::types::*;
use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// The media player reached the end of a question or answer segment
    PlaybackEnded(Segment),
    GroomAnswered(String),
    /// Raised after a vote lands; only succeeds once every voter is in
    AllVotesIn,
    /// The active phase countdown ran out
    TimerExpired,
    Judged {
        groom_correct: bool,
    },
    VictimSelected(PlayerId),
    /// The victim roulette finished spinning
    RevealSettled,
    /// Operator confirms the mission (or consequence) is done
    RoundComplete,
}

impl RoundEvent {
    fn name(&self) -> &'static str {
        match self {
            RoundEvent::PlaybackEnded(_) => "PlaybackEnded",
            RoundEvent::GroomAnswered(_) => "GroomAnswered",
            RoundEvent::AllVotesIn => "AllVotesIn",
            RoundEvent::TimerExpired => "TimerExpired",
            RoundEvent::Judged { .. } => "Judged",
            RoundEvent::VictimSelected(_) => "VictimSelected",
            RoundEvent::RevealSettled => "RevealSettled",
            RoundEvent::RoundComplete => "RoundComplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Game is in {actual:?} stage, expected {expected:?}")]
    WrongStage {
        expected: GameStage,
        actual: GameStage,
    },
    #[error("{event} is not accepted during {phase:?}")]
    WrongPhase {
        event: &'static str,
        phase: RoundPhase,
    },
    #[error("Player {0} is not among this round's losers")]
    NotALoser(PlayerId),
    #[error("{0} votes still outstanding")]
    VotesOutstanding(usize),
    #[error("Phase countdown has not expired")]
    TimerRunning,
    #[error("Game is paused")]
    Paused,
    #[error("Cannot start a game without players")]
    NoPlayers,
    #[error("Cannot start a game without questions")]
    NoQuestions,
    #[error("Cannot judge a round without a groom")]
    NoGroom,
}

impl TransitionError {
    /// Inputs that lost a race against a phase change. Expected under
    /// network latency, so callers drop them quietly.
    pub fn is_phase_race(&self) -> bool {
        matches!(
            self,
            TransitionError::WrongStage { .. }
                | TransitionError::WrongPhase { .. }
                | TransitionError::TimerRunning
                | TransitionError::Paused
                | TransitionError::VotesOutstanding(_)
        )
    }
}

/// LOBBY -> PLAYING, positioned on the first question
pub fn start_game(
    session: &Session,
    config: &GameConfig,
    now: Instant,
) -> Result<Session, TransitionError> {
    if session.stage != GameStage::Lobby {
        return Err(TransitionError::WrongStage {
            expected: GameStage::Lobby,
            actual: session.stage,
        });
    }
    if session.players.is_empty() {
        return Err(TransitionError::NoPlayers);
    }
    if session.questions.is_empty() {
        return Err(TransitionError::NoQuestions);
    }

    let mut next = session.clone();
    next.stage = GameStage::Playing;
    begin_question(&mut next, 0, config, now);
    Ok(next)
}

/// Advance one round event
pub fn transition<R: Rng + ?Sized>(
    session: &Session,
    event: RoundEvent,
    config: &GameConfig,
    now: Instant,
    rng: &mut R,
) -> Result<Session, TransitionError> {
    use RoundPhase::*;

    if session.stage != GameStage::Playing {
        return Err(TransitionError::WrongStage {
            expected: GameStage::Playing,
            actual: session.stage,
        });
    }

    let mut next = session.clone();

    match (session.round_phase, event) {
        (Question, RoundEvent::PlaybackEnded(Segment::Question)) => {
            enter_phase(&mut next, GroomAnswering, config, now);
        }

        (GroomAnswering, RoundEvent::GroomAnswered(answer)) => {
            next.groom_answer = Some(answer);
            open_voting(&mut next, config, now);
        }
        (GroomAnswering, RoundEvent::TimerExpired) => {
            ensure_expired(session, now)?;
            open_voting(&mut next, config, now);
        }

        (Voting, RoundEvent::AllVotesIn) => {
            if session.is_paused {
                return Err(TransitionError::Paused);
            }
            let missing = session.missing_voters().len();
            if missing > 0 {
                return Err(TransitionError::VotesOutstanding(missing));
            }
            enter_phase(&mut next, Reveal, config, now);
        }
        (Voting, RoundEvent::TimerExpired) => {
            ensure_expired(session, now)?;
            fill_missing_votes(&mut next, rng);
            enter_phase(&mut next, Reveal, config, now);
        }

        (Reveal, RoundEvent::PlaybackEnded(Segment::Answer)) => {
            enter_phase(&mut next, Judgment, config, now);
        }

        (Judgment, RoundEvent::Judged { groom_correct }) => {
            if session.groom().is_none() {
                return Err(TransitionError::NoGroom);
            }
            // Anyone still without a vote (joined after voting closed) gets a coin flip
            fill_missing_votes(&mut next, rng);
            let losers =
                score_judgment(&mut next.players, &next.current_votes, groom_correct, config);

            next.groom_result = Some(groom_correct);
            if groom_correct {
                next.groom_correct_count += 1;
            }
            let phase = if losers.is_empty() {
                Consequence
            } else {
                VictimSelection
            };
            next.round_losers = losers;
            enter_phase(&mut next, phase, config, now);
        }

        (VictimSelection, RoundEvent::VictimSelected(victim_id)) => {
            if !session.is_loser(&victim_id) {
                return Err(TransitionError::NotALoser(victim_id));
            }
            select_victim(&mut next, victim_id);
            enter_phase(&mut next, VictimReveal, config, now);
        }
        (VictimSelection, RoundEvent::TimerExpired) => {
            ensure_expired(session, now)?;
            if let Some(victim_id) = pick_victim(session, rng) {
                select_victim(&mut next, victim_id);
            }
            enter_phase(&mut next, VictimReveal, config, now);
        }

        (VictimReveal, RoundEvent::RevealSettled) => {
            next.active_mission = session.missions.choose(rng).cloned();
            enter_phase(&mut next, MissionExecution, config, now);
        }

        (MissionExecution | Consequence, RoundEvent::RoundComplete) => {
            let upcoming = session.current_question_index + 1;
            if upcoming < session.questions.len() {
                begin_question(&mut next, upcoming, config, now);
            } else {
                clear_round(&mut next);
                next.current_question_index = session.questions.len();
                next.countdown = None;
                next.time_left = None;
                next.stage = GameStage::Summary;
            }
        }

        (phase, event) => {
            return Err(TransitionError::WrongPhase {
                event: event.name(),
                phase,
            });
        }
    }

    Ok(next)
}

/// Losers still present and not yet picked in an earlier round are preferred
pub fn pick_victim<R: Rng + ?Sized>(session: &Session, rng: &mut R) -> Option<PlayerId> {
    let present: Vec<&PlayerId> = session
        .round_losers
        .iter()
        .filter(|id| session.player(id).is_some())
        .collect();
    let fresh: Vec<&PlayerId> = present
        .iter()
        .copied()
        .filter(|id| !session.past_victims.contains(id))
        .collect();

    let pool = if fresh.is_empty() { present } else { fresh };
    pool.choose(rng).map(|id| (*id).clone())
}

/// Give every voter without a vote a random one
pub fn fill_missing_votes<R: Rng + ?Sized>(session: &mut Session, rng: &mut R) {
    for id in session.missing_voters() {
        let vote = rng.random_bool(0.5);
        tracing::debug!("Auto-vote for {}: {}", id, vote);
        session.current_votes.insert(id, vote);
    }
}

/// Rebuild the countdown after a restore; the remaining seconds come from `time_left`
pub fn restore_countdown(session: &mut Session, config: &GameConfig, now: Instant) {
    session.countdown = if session.stage == GameStage::Playing && session.round_phase.is_timed() {
        session
            .time_left
            .or_else(|| config.phase_seconds(session.round_phase))
            .map(|secs| Countdown::from_seconds(secs, now, session.is_paused))
    } else {
        None
    };
    session.time_left = session.countdown.map(|c| c.remaining_secs(now));
}

fn ensure_expired(session: &Session, now: Instant) -> Result<(), TransitionError> {
    match session.countdown {
        Some(countdown) if countdown.is_expired(now) => Ok(()),
        Some(_) if session.is_paused => Err(TransitionError::Paused),
        _ => Err(TransitionError::TimerRunning),
    }
}

fn enter_phase(session: &mut Session, phase: RoundPhase, config: &GameConfig, now: Instant) {
    session.round_phase = phase;
    if phase == RoundPhase::Voting {
        session.current_votes.clear();
    }
    // Replacing the countdown is what cancels the previous phase's timer
    session.countdown = config
        .phase_seconds(phase)
        .map(|secs| Countdown::from_seconds(secs, now, session.is_paused));
    session.time_left = session.countdown.map(|c| c.remaining_secs(now));
}

/// Voting with nobody eligible is already complete
fn open_voting(session: &mut Session, config: &GameConfig, now: Instant) {
    enter_phase(session, RoundPhase::Voting, config, now);
    if !session.is_paused && session.missing_voters().is_empty() {
        enter_phase(session, RoundPhase::Reveal, config, now);
    }
}

fn select_victim(session: &mut Session, victim_id: PlayerId) {
    if !session.past_victims.contains(&victim_id) {
        session.past_victims.push(victim_id.clone());
    }
    session.selected_victim_id = Some(victim_id);
}

fn clear_round(session: &mut Session) {
    session.current_votes.clear();
    session.groom_answer = None;
    session.groom_result = None;
    session.round_losers.clear();
    session.selected_victim_id = None;
    session.active_mission = None;
}

fn begin_question(session: &mut Session, index: usize, config: &GameConfig, now: Instant) {
    clear_round(session);
    session.current_question_index = index;
    enter_phase(session, RoundPhase::Question, config, now);
}
