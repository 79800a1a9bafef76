use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Goal, GoalId, Marker, MarkerId, Participant, ParticipantId, Retrospective};

/// A discrete state transition request. Each one is applied atomically and
/// independently by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    SetRetro(Retrospective),
    AddParticipant(Participant),
    UpdateParticipant(Participant),
    AddGoal(Goal),
    UpdateGoal(Goal),
    RemoveGoal(GoalId),
    AddMarker(Marker),
    UpdateMarker(Marker),
    RemoveMarker(MarkerId),
    SetFacilitator(bool),
    SetParticipantId(Option<ParticipantId>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetRetro(_) => "set_retro",
            Action::AddParticipant(_) => "add_participant",
            Action::UpdateParticipant(_) => "update_participant",
            Action::AddGoal(_) => "add_goal",
            Action::UpdateGoal(_) => "update_goal",
            Action::RemoveGoal(_) => "remove_goal",
            Action::AddMarker(_) => "add_marker",
            Action::UpdateMarker(_) => "update_marker",
            Action::RemoveMarker(_) => "remove_marker",
            Action::SetFacilitator(_) => "set_facilitator",
            Action::SetParticipantId(_) => "set_participant_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAction {
    pub index: usize,
    pub reason: String,
}

/// Result of decoding an action log: the actions that parsed, in order,
/// plus the entries that were dropped.
#[derive(Debug, Clone, Default)]
pub struct ActionBatch {
    pub actions: Vec<Action>,
    pub skipped: Vec<SkippedAction>,
}

/// Decodes a JSON array of actions.
///
/// Only a malformed document is an error. Individual entries with an unknown
/// `type` or an invalid payload are skipped, so a log written by a newer
/// client still replays.
pub fn decode_actions(raw: &str) -> Result<ActionBatch, serde_json::Error> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut batch = ActionBatch::default();

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Action>(entry) {
            Ok(action) => batch.actions.push(action),
            Err(err) => {
                warn!(index, error = %err, "skipping undecodable action");
                batch.skipped.push(SkippedAction {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(batch)
}
