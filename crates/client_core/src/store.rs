//! The retrospective aggregate and its transition function.
//!
//! Markers are stored once, in insertion order. The per-goal view is an index
//! of marker ids maintained by the same transitions that touch the marker
//! list, so the flat view and the by-goal view cannot disagree on the marker
//! set.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use shared::{
    domain::{Goal, GoalId, Marker, MarkerId, Participant, ParticipantId, Retrospective, SessionId},
    protocol::Action,
};
use thiserror::Error;

/// Why an action left the state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ignored {
    #[error("participant {0} already exists")]
    DuplicateParticipant(ParticipantId),
    #[error("participant {0} does not exist")]
    UnknownParticipant(ParticipantId),
    #[error("goal {0} already exists")]
    DuplicateGoal(GoalId),
    #[error("goal {0} does not exist")]
    UnknownGoal(GoalId),
    #[error("marker {0} already exists")]
    DuplicateMarker(MarkerId),
    #[error("marker {0} does not exist")]
    UnknownMarker(MarkerId),
    #[error("marker {marker} references missing goal {goal}")]
    OrphanMarker { marker: MarkerId, goal: GoalId },
}

/// Retrospective metadata without the collections, which the state keeps
/// in its own normalized form.
#[derive(Debug, Clone, PartialEq)]
pub struct RetroHeader {
    pub id: SessionId,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Retrospective> for RetroHeader {
    fn from(retro: &Retrospective) -> Self {
        Self {
            id: retro.id.clone(),
            title: retro.title.clone(),
            is_active: retro.is_active,
            created_at: retro.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrospectiveState {
    current_retro: Option<RetroHeader>,
    participants: Vec<Participant>,
    goals: Vec<Goal>,
    markers: Vec<Marker>,
    goal_markers: HashMap<GoalId, Vec<MarkerId>>,
    is_facilitator: bool,
    participant_id: Option<ParticipantId>,
}

impl RetrospectiveState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one action and returns the resulting state. `self` is left
    /// untouched. Precondition misses yield an unchanged copy.
    pub fn apply(&self, action: &Action) -> Self {
        self.step(action).0
    }

    /// Like [`apply`](Self::apply), also reporting why the action was a no-op.
    pub fn step(&self, action: &Action) -> (Self, Option<Ignored>) {
        let mut next = self.clone();
        let ignored = next.transition(action).err();
        (next, ignored)
    }

    pub fn current_retro(&self) -> Option<&RetroHeader> {
        self.current_retro.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Every marker, in the order it was added.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Ids of the markers placed against `goal_id`, in the order they joined
    /// that goal. Empty for unknown goals.
    pub fn marker_ids_for_goal(&self, goal_id: &GoalId) -> &[MarkerId] {
        self.goal_markers
            .get(goal_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_facilitator(&self) -> bool {
        self.is_facilitator
    }

    pub fn participant_id(&self) -> Option<&ParticipantId> {
        self.participant_id.as_ref()
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn goal(&self, id: &GoalId) -> Option<&Goal> {
        self.goals.iter().find(|g| &g.id == id)
    }

    pub fn marker(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| &m.id == id)
    }

    // Every arm checks its preconditions before mutating, so an `Err` leaves
    // `self` exactly as it was.
    fn transition(&mut self, action: &Action) -> Result<(), Ignored> {
        match action {
            Action::SetRetro(retro) => {
                self.load_retro(retro);
                Ok(())
            }
            Action::AddParticipant(participant) => {
                if self.participant(&participant.id).is_some() {
                    return Err(Ignored::DuplicateParticipant(participant.id.clone()));
                }
                self.participants.push(participant.clone());
                Ok(())
            }
            Action::UpdateParticipant(participant) => {
                let slot = self
                    .participants
                    .iter_mut()
                    .find(|p| p.id == participant.id)
                    .ok_or_else(|| Ignored::UnknownParticipant(participant.id.clone()))?;
                *slot = participant.clone();
                Ok(())
            }
            Action::AddGoal(goal) => {
                if self.goal(&goal.id).is_some() {
                    return Err(Ignored::DuplicateGoal(goal.id.clone()));
                }
                self.insert_goal(goal.clone());
                Ok(())
            }
            Action::UpdateGoal(goal) => {
                let slot = self
                    .goals
                    .iter_mut()
                    .find(|g| g.id == goal.id)
                    .ok_or_else(|| Ignored::UnknownGoal(goal.id.clone()))?;
                *slot = goal.clone();
                Ok(())
            }
            Action::RemoveGoal(goal_id) => {
                if self.goal(goal_id).is_none() {
                    return Err(Ignored::UnknownGoal(goal_id.clone()));
                }
                self.goals.retain(|g| &g.id != goal_id);
                self.markers.retain(|m| &m.goal_id != goal_id);
                self.goal_markers.remove(goal_id);
                Ok(())
            }
            Action::AddMarker(marker) => {
                if self.marker(&marker.id).is_some() {
                    return Err(Ignored::DuplicateMarker(marker.id.clone()));
                }
                if self.goal(&marker.goal_id).is_none() {
                    return Err(Ignored::OrphanMarker {
                        marker: marker.id.clone(),
                        goal: marker.goal_id.clone(),
                    });
                }
                self.insert_marker(marker.clone());
                Ok(())
            }
            Action::UpdateMarker(marker) => self.replace_marker(marker),
            Action::RemoveMarker(marker_id) => {
                let Some(existing) = self.marker(marker_id) else {
                    return Err(Ignored::UnknownMarker(marker_id.clone()));
                };
                let goal_id = existing.goal_id.clone();
                self.markers.retain(|m| &m.id != marker_id);
                if let Some(ids) = self.goal_markers.get_mut(&goal_id) {
                    ids.retain(|id| id != marker_id);
                }
                Ok(())
            }
            Action::SetFacilitator(is_facilitator) => {
                self.is_facilitator = *is_facilitator;
                Ok(())
            }
            Action::SetParticipantId(participant_id) => {
                self.participant_id = participant_id.clone();
                Ok(())
            }
        }
    }

    // Session-local fields (facilitator flag, own participant id) survive a
    // retro reload.
    fn load_retro(&mut self, retro: &Retrospective) {
        self.current_retro = Some(RetroHeader::from(retro));
        self.participants.clear();
        self.goals.clear();
        self.markers.clear();
        self.goal_markers.clear();

        for participant in &retro.participants {
            if self.participant(&participant.id).is_none() {
                self.participants.push(participant.clone());
            }
        }

        for nested in &retro.goals {
            if self.goal(&nested.goal.id).is_some() {
                continue;
            }
            self.insert_goal(nested.goal.clone());
            for marker in &nested.markers {
                if self.marker(&marker.id).is_some() {
                    continue;
                }
                // The goal a marker is nested under is authoritative.
                let mut marker = marker.clone();
                marker.goal_id = nested.goal.id.clone();
                self.insert_marker(marker);
            }
        }
    }

    fn insert_goal(&mut self, goal: Goal) {
        self.goal_markers.insert(goal.id.clone(), Vec::new());
        self.goals.push(goal);
    }

    fn insert_marker(&mut self, marker: Marker) {
        self.goal_markers
            .entry(marker.goal_id.clone())
            .or_default()
            .push(marker.id.clone());
        self.markers.push(marker);
    }

    fn replace_marker(&mut self, marker: &Marker) -> Result<(), Ignored> {
        let index = self
            .markers
            .iter()
            .position(|m| m.id == marker.id)
            .ok_or_else(|| Ignored::UnknownMarker(marker.id.clone()))?;

        let previous_goal = self.markers[index].goal_id.clone();
        if previous_goal != marker.goal_id {
            if self.goal(&marker.goal_id).is_none() {
                return Err(Ignored::OrphanMarker {
                    marker: marker.id.clone(),
                    goal: marker.goal_id.clone(),
                });
            }
            if let Some(ids) = self.goal_markers.get_mut(&previous_goal) {
                ids.retain(|id| id != &marker.id);
            }
            self.goal_markers
                .entry(marker.goal_id.clone())
                .or_default()
                .push(marker.id.clone());
        }

        self.markers[index] = marker.clone();
        Ok(())
    }
}
