//! Read-side lookups over a [`RetrospectiveState`] or plain slices of it.

use serde::Serialize;
use shared::domain::{
    GoalId, Marker, NestedGoal, Participant, ParticipantId, Retrospective, Score,
};

use crate::store::RetrospectiveState;

/// Display name used when a marker points at a participant that is not in
/// the participant list.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

pub fn participant_name<'a>(participants: &'a [Participant], id: &ParticipantId) -> &'a str {
    participants
        .iter()
        .find(|p| &p.id == id)
        .map(|p| p.name.as_str())
        .unwrap_or(UNKNOWN_PARTICIPANT)
}

/// Markers placed against `goal_id`, read through the goal index.
pub fn markers_for_goal<'a>(state: &'a RetrospectiveState, goal_id: &GoalId) -> Vec<&'a Marker> {
    state
        .marker_ids_for_goal(goal_id)
        .iter()
        .filter_map(|id| state.marker(id))
        .collect()
}

/// Markers placed against `goal_id`, found by scanning a flat list.
pub fn filter_markers_for_goal<'a>(markers: &'a [Marker], goal_id: &GoalId) -> Vec<&'a Marker> {
    markers.iter().filter(|m| &m.goal_id == goal_id).collect()
}

pub fn markers_by_participant<'a>(
    state: &'a RetrospectiveState,
    participant_id: &ParticipantId,
) -> Vec<&'a Marker> {
    state
        .markers()
        .iter()
        .filter(|m| &m.participant_id == participant_id)
        .collect()
}

/// Goals joined with their markers, in goal order.
pub fn nested_goals(state: &RetrospectiveState) -> Vec<NestedGoal> {
    state
        .goals()
        .iter()
        .map(|goal| NestedGoal {
            goal: goal.clone(),
            markers: markers_for_goal(state, &goal.id)
                .into_iter()
                .cloned()
                .collect(),
        })
        .collect()
}

/// Rebuilds the denormalized retrospective document, or `None` before the
/// session has loaded one.
pub fn retrospective(state: &RetrospectiveState) -> Option<Retrospective> {
    let header = state.current_retro()?;
    Some(Retrospective {
        id: header.id.clone(),
        title: header.title.clone(),
        goals: nested_goals(state),
        participants: state.participants().to_vec(),
        is_active: header.is_active,
        created_at: header.created_at,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoardSummary {
    pub goals: usize,
    pub participants: usize,
    pub markers: usize,
}

impl BoardSummary {
    pub fn of(state: &RetrospectiveState) -> Self {
        Self {
            goals: state.goals().len(),
            participants: state.participants().len(),
            markers: state.markers().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<Score>,
    pub max: Option<Score>,
}

pub fn score_stats<'a>(markers: impl IntoIterator<Item = &'a Marker>) -> ScoreStats {
    let mut stats = ScoreStats::default();
    let mut total = 0u32;

    for marker in markers {
        stats.count += 1;
        total += u32::from(marker.score.value());
        stats.min = Some(stats.min.map_or(marker.score, |min| min.min(marker.score)));
        stats.max = Some(stats.max.map_or(marker.score, |max| max.max(marker.score)));
    }

    if stats.count > 0 {
        stats.mean = Some(f64::from(total) / stats.count as f64);
    }
    stats
}
