use crate::types::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Join(JoinPayload),
    #[serde(rename_all = "camelCase")]
    Vote {
        player_id: PlayerId,
        vote: bool,
    },
    GroomAnswer {
        answer: String,
    },
    #[serde(rename_all = "camelCase")]
    GroomSelectVictim {
        victim_id: PlayerId,
    },
    // Host-only messages
    HostStartGame,
    HostPlaybackEnded {
        segment: Segment,
    },
    #[serde(rename_all = "camelCase")]
    HostJudge {
        groom_correct: bool,
    },
    HostRevealSettled,
    HostRoundComplete,
    HostSetPaused {
        paused: bool,
    },
    #[serde(rename_all = "camelCase")]
    HostKick {
        player_id: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    HostAddBots {
        count: u32,
        /// Make the first new bot the groom
        #[serde(default)]
        as_groom: bool,
    },
    HostResetGame,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    /// Stable game-logic id chosen by the client, not the transport peer id
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub is_groom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    StateUpdate(SessionPatch),
    /// Sent when the host removes a player so their own mirror lets go of them
    #[serde(rename_all = "camelCase")]
    Kick {
        player_id: PlayerId,
    },
    /// Final ranking, sent once the game reaches SUMMARY
    Standings {
        players: Vec<Player>,
    },
    /// Host-only: live vote counts for the current question
    HostVoteTally {
        yes: u32,
        no: u32,
        outstanding: u32,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// A shallow partial `Session`: absent fields are left untouched on merge.
///
/// Nullable fields use a double option so that an explicit `null` on the
/// wire clears the value while an absent key keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub game_code: Option<Option<GameCode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<GameStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_phase: Option<RoundPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Player>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QAPair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missions: Option<Vec<Mission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_votes: Option<BTreeMap<PlayerId, bool>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub groom_answer: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub groom_result: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groom_correct_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_losers: Option<Vec<PlayerId>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub selected_victim_id: Option<Option<PlayerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_victims: Option<Vec<PlayerId>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub active_mission: Option<Option<Mission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub time_left: Option<Option<u32>>,
}

/// Present-but-null becomes `Some(None)`; a missing key stays `None` via `default`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SessionPatch {
    /// Every broadcastable field of `session`, copied as-is
    pub fn full(session: &Session) -> Self {
        Self {
            game_code: Some(session.game_code.clone()),
            version: Some(session.version),
            stage: Some(session.stage),
            round_phase: Some(session.round_phase),
            players: Some(session.players.clone()),
            questions: Some(session.questions.clone()),
            missions: Some(session.missions.clone()),
            current_question_index: Some(session.current_question_index),
            current_votes: Some(session.current_votes.clone()),
            groom_answer: Some(session.groom_answer.clone()),
            groom_result: Some(session.groom_result),
            groom_correct_count: Some(session.groom_correct_count),
            round_losers: Some(session.round_losers.clone()),
            selected_victim_id: Some(session.selected_victim_id.clone()),
            past_victims: Some(session.past_victims.clone()),
            active_mission: Some(session.active_mission.clone()),
            is_paused: Some(session.is_paused),
            is_host: Some(session.is_host),
            time_left: Some(session.time_left),
        }
    }
}

impl Session {
    /// Shallow merge: each field present in the patch replaces the current value
    pub fn merge(&mut self, patch: SessionPatch) {
        if let Some(v) = patch.game_code {
            self.game_code = v;
        }
        if let Some(v) = patch.version {
            self.version = v;
        }
        if let Some(v) = patch.stage {
            self.stage = v;
        }
        if let Some(v) = patch.round_phase {
            self.round_phase = v;
        }
        if let Some(v) = patch.players {
            self.players = v;
        }
        if let Some(v) = patch.questions {
            self.questions = v;
        }
        if let Some(v) = patch.missions {
            self.missions = v;
        }
        if let Some(v) = patch.current_question_index {
            self.current_question_index = v;
        }
        if let Some(v) = patch.current_votes {
            self.current_votes = v;
        }
        if let Some(v) = patch.groom_answer {
            self.groom_answer = v;
        }
        if let Some(v) = patch.groom_result {
            self.groom_result = v;
        }
        if let Some(v) = patch.groom_correct_count {
            self.groom_correct_count = v;
        }
        if let Some(v) = patch.round_losers {
            self.round_losers = v;
        }
        if let Some(v) = patch.selected_victim_id {
            self.selected_victim_id = v;
        }
        if let Some(v) = patch.past_victims {
            self.past_victims = v;
        }
        if let Some(v) = patch.active_mission {
            self.active_mission = v;
        }
        if let Some(v) = patch.is_paused {
            self.is_paused = v;
        }
        if let Some(v) = patch.is_host {
            self.is_host = v;
        }
        if let Some(v) = patch.time_left {
            self.time_left = v;
        }
    }
}
