use crate::timer::Countdown;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque ID types for type safety
pub type GameCode = String;
pub type PlayerId = String;
pub type QuestionId = String;
pub type MissionId = String;
pub type AssetId = String;

/// Which side of the host/client split a connection speaks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operator screen of the authoritative host
    Host,
    Player,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStage {
    #[default]
    Setup,
    Lobby,
    Playing,
    Summary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    #[default]
    Question,
    GroomAnswering,
    Voting,
    Reveal,
    Judgment,
    /// Nobody lost the round, so there is no victim to pick
    Consequence,
    VictimSelection,
    VictimReveal,
    MissionExecution,
}

impl RoundPhase {
    /// Phases that run a host-side countdown
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            RoundPhase::GroomAnswering | RoundPhase::Voting | RoundPhase::VictimSelection
        )
    }
}

/// Which playback cue the media player reports as finished
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    Question,
    Answer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Opaque blob reference (usually a data URL of the player's selfie)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub drinks: u32,
    #[serde(default)]
    pub is_groom: bool,
    #[serde(default)]
    pub is_bot: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            photo: None,
            score: 0,
            drinks: 0,
            is_groom: false,
            is_bot: false,
        }
    }
}

/// A question/answer pair cut from a video asset.
///
/// The four timecodes are playback cues for the media player; the round
/// state machine never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QAPair {
    pub id: QuestionId,
    pub video_id: AssetId,
    pub question: String,
    pub answer: String,
    pub q_start: f64,
    pub q_end: f64,
    pub a_start: f64,
    pub a_end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mission {
    pub id: MissionId,
    pub text: String,
}

/// Everything the host needs to open a lobby
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub questions: Vec<QAPair>,
    #[serde(default)]
    pub missions: Vec<Mission>,
    /// Media asset id -> opaque reference (path or URL) for the player
    #[serde(default)]
    pub videos: HashMap<AssetId, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub groom_answer_seconds: u32,
    pub voting_seconds: u32,
    pub victim_selection_seconds: u32,
    /// Points for a voter whose prediction matched the judgment
    pub correct_vote_reward: u32,
    /// Points for the groom when judged correct
    pub groom_correct_reward: u32,
    /// Whether a groom judged wrong takes a drink too
    pub groom_drinks_when_wrong: bool,
    pub bot_min_delay_ms: u64,
    pub bot_max_delay_ms: u64,
    /// Fixed seed for auto-votes and random picks (None = OS entropy)
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            groom_answer_seconds: 30,
            voting_seconds: 10,
            victim_selection_seconds: 20,
            correct_vote_reward: 5,
            groom_correct_reward: 10,
            groom_drinks_when_wrong: false,
            bot_min_delay_ms: 1500,
            bot_max_delay_ms: 4000,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Countdown length for a timed phase
    pub fn phase_seconds(&self, phase: RoundPhase) -> Option<u32> {
        match phase {
            RoundPhase::GroomAnswering => Some(self.groom_answer_seconds),
            RoundPhase::Voting => Some(self.voting_seconds),
            RoundPhase::VictimSelection => Some(self.victim_selection_seconds),
            _ => None,
        }
    }
}

/// The root aggregate. Owned by the host; clients hold a mirror built from snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub game_code: Option<GameCode>,
    pub version: u64,
    pub stage: GameStage,
    pub round_phase: RoundPhase,
    pub players: Vec<Player>,
    pub questions: Vec<QAPair>,
    #[serde(default)]
    pub missions: Vec<Mission>,
    pub current_question_index: usize,
    pub current_votes: BTreeMap<PlayerId, bool>,
    pub groom_answer: Option<String>,
    #[serde(default)]
    pub groom_result: Option<bool>,
    #[serde(default)]
    pub groom_correct_count: u32,
    pub round_losers: Vec<PlayerId>,
    pub selected_victim_id: Option<PlayerId>,
    pub past_victims: Vec<PlayerId>,
    #[serde(default)]
    pub active_mission: Option<Mission>,
    pub is_paused: bool,
    #[serde(default)]
    pub is_host: bool,
    /// Whole seconds left on the active phase countdown
    #[serde(default)]
    pub time_left: Option<u32>,
    /// Host-only media references, never broadcast
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub videos: HashMap<AssetId, String>,
    #[serde(skip)]
    pub countdown: Option<Countdown>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            game_code: None,
            version: 0,
            stage: GameStage::Setup,
            round_phase: RoundPhase::Question,
            players: Vec::new(),
            questions: Vec::new(),
            missions: Vec::new(),
            current_question_index: 0,
            current_votes: BTreeMap::new(),
            groom_answer: None,
            groom_result: None,
            groom_correct_count: 0,
            round_losers: Vec::new(),
            selected_victim_id: None,
            past_victims: Vec::new(),
            active_mission: None,
            is_paused: false,
            is_host: false,
            time_left: None,
            videos: HashMap::new(),
            countdown: None,
        }
    }
}

impl Session {
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn groom(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_groom)
    }

    /// Ids of every player who votes on the groom (everyone except the groom)
    pub fn eligible_voters(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter().filter(|p| !p.is_groom).map(|p| &p.id)
    }

    pub fn missing_voters(&self) -> Vec<PlayerId> {
        self.eligible_voters()
            .filter(|id| !self.current_votes.contains_key(*id))
            .cloned()
            .collect()
    }

    pub fn current_question(&self) -> Option<&QAPair> {
        self.questions.get(self.current_question_index)
    }

    pub fn is_loser(&self, id: &str) -> bool {
        self.round_losers.iter().any(|l| l == id)
    }
}
