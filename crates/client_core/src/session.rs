//! Session handle: the single owner of a board's state.
//!
//! Everything that reads or changes the board goes through a [`Session`], so
//! there is no way to reach the store without an initialized session. The
//! intent helpers validate input and capabilities before building an action;
//! the store only ever sees well-formed actions.

use shared::{
    domain::{
        Color, Goal, GoalId, Marker, MarkerId, Participant, ParticipantId, Position,
        Retrospective, Score, SessionId,
    },
    error::DomainError,
    protocol::Action,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    export::ExportSnapshot,
    store::{Ignored, RetrospectiveState},
};

/// Query parameter carrying the session id in a board address.
pub const SESSION_QUERY_KEY: &str = "session";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("only the facilitator can {0}")]
    FacilitatorRequired(&'static str),
    #[error("join the session as a participant before placing markers")]
    NotJoined,
    #[error("participant {0} does not exist")]
    UnknownParticipant(ParticipantId),
    #[error("goal {0} does not exist")]
    UnknownGoal(GoalId),
    #[error("marker {0} does not exist")]
    UnknownMarker(MarkerId),
    #[error("no marker is picked up")]
    NothingPicked,
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    location: Url,
    state: RetrospectiveState,
    picked: Option<MarkerId>,
}

impl Session {
    /// Opens the session named by the `session` query parameter of
    /// `location`, or a fresh one when the parameter is missing or blank.
    pub fn open(location: &Url, title: &str) -> Self {
        let id = session_id_from(location).unwrap_or_else(SessionId::generate);
        info!(session = %id, "opening retrospective session");

        let mut session = Self {
            id: id.clone(),
            location: location.clone(),
            state: RetrospectiveState::new(),
            picked: None,
        };
        session.dispatch(Action::SetRetro(Retrospective::new(id, title)));
        session
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> &RetrospectiveState {
        &self.state
    }

    /// Board address with the loaded retrospective's id as its only query
    /// parameter.
    pub fn share_link(&self) -> Url {
        let mut link = self.location.clone();
        link.set_query(None);
        link.set_fragment(None);
        link.query_pairs_mut()
            .append_pair(SESSION_QUERY_KEY, self.id.as_str());
        link
    }

    /// Applies `action` and returns the reason it was ignored, if it was.
    pub fn dispatch(&mut self, action: Action) -> Option<Ignored> {
        let (next, ignored) = self.state.step(&action);
        self.state = next;
        if let Action::SetRetro(retro) = &action {
            // The loaded document decides which session this is.
            if retro.id != self.id {
                info!(from = %self.id, to = %retro.id, "session switched retrospective");
                self.id = retro.id.clone();
            }
            self.picked = None;
        }
        match &ignored {
            Some(reason) => {
                warn!(session = %self.id, action = action.name(), %reason, "action ignored")
            }
            None => debug!(session = %self.id, action = action.name(), "action applied"),
        }
        ignored
    }

    /// Whether the welcome step is done: the user joined as a participant or
    /// took the facilitator role.
    pub fn has_joined(&self) -> bool {
        self.state.is_facilitator() || self.state.participant_id().is_some()
    }

    pub fn is_facilitator(&self) -> bool {
        self.state.is_facilitator()
    }

    pub fn join_as_facilitator(&mut self) {
        self.dispatch(Action::SetFacilitator(true));
    }

    pub fn join_as_participant(
        &mut self,
        name: &str,
        color: Color,
    ) -> Result<ParticipantId, SessionError> {
        let participant = Participant::new(name, color)?;
        let id = participant.id.clone();
        self.dispatch(Action::AddParticipant(participant));
        self.dispatch(Action::SetParticipantId(Some(id.clone())));
        Ok(id)
    }

    /// Adds someone to the board without changing who this session acts as.
    pub fn add_participant(
        &mut self,
        name: &str,
        color: Color,
    ) -> Result<ParticipantId, SessionError> {
        self.require_facilitator("add participants")?;
        let participant = Participant::new(name, color)?;
        let id = participant.id.clone();
        self.dispatch(Action::AddParticipant(participant));
        Ok(id)
    }

    /// Lets the facilitator place markers on behalf of `participant_id`.
    pub fn act_as(&mut self, participant_id: &ParticipantId) -> Result<(), SessionError> {
        self.require_facilitator("act as another participant")?;
        self.require_participant(participant_id)?;
        self.dispatch(Action::SetParticipantId(Some(participant_id.clone())));
        Ok(())
    }

    /// Participants may edit themselves; the facilitator may edit anyone.
    pub fn update_participant(
        &mut self,
        participant_id: &ParticipantId,
        name: &str,
        color: Color,
    ) -> Result<(), SessionError> {
        if self.state.participant_id() != Some(participant_id) {
            self.require_facilitator("edit other participants")?;
        }
        self.require_participant(participant_id)?;
        let mut updated = Participant::new(name, color)?;
        updated.id = participant_id.clone();
        self.dispatch(Action::UpdateParticipant(updated));
        Ok(())
    }

    pub fn add_goal(&mut self, text: &str) -> Result<GoalId, SessionError> {
        self.require_facilitator("add goals")?;
        let goal = Goal::new(text)?;
        let id = goal.id.clone();
        self.dispatch(Action::AddGoal(goal));
        Ok(id)
    }

    pub fn rename_goal(&mut self, goal_id: &GoalId, text: &str) -> Result<(), SessionError> {
        self.require_facilitator("edit goals")?;
        let goal = self
            .state
            .goal(goal_id)
            .ok_or_else(|| SessionError::UnknownGoal(goal_id.clone()))?
            .with_text(text)?;
        self.dispatch(Action::UpdateGoal(goal));
        Ok(())
    }

    pub fn remove_goal(&mut self, goal_id: &GoalId) -> Result<(), SessionError> {
        self.require_facilitator("remove goals")?;
        if self.picked.as_ref().is_some_and(|id| {
            self.state
                .marker(id)
                .is_some_and(|marker| &marker.goal_id == goal_id)
        }) {
            self.picked = None;
        }
        self.dispatch(Action::RemoveGoal(goal_id.clone()));
        Ok(())
    }

    /// Places a marker for the session's participant at the board center.
    pub fn place_marker(
        &mut self,
        goal_id: &GoalId,
        score: Score,
        color: Color,
    ) -> Result<MarkerId, SessionError> {
        let participant_id = self
            .state
            .participant_id()
            .cloned()
            .ok_or(SessionError::NotJoined)?;
        self.require_participant(&participant_id)?;
        if self.state.goal(goal_id).is_none() {
            return Err(SessionError::UnknownGoal(goal_id.clone()));
        }
        let marker = Marker::new(participant_id, goal_id.clone(), score, color);
        let id = marker.id.clone();
        self.dispatch(Action::AddMarker(marker));
        Ok(id)
    }

    pub fn move_marker(
        &mut self,
        marker_id: &MarkerId,
        position: Position,
    ) -> Result<(), SessionError> {
        let moved = self
            .state
            .marker(marker_id)
            .ok_or_else(|| SessionError::UnknownMarker(marker_id.clone()))?
            .moved_to(position);
        self.dispatch(Action::UpdateMarker(moved));
        Ok(())
    }

    pub fn remove_marker(&mut self, marker_id: &MarkerId) -> Result<(), SessionError> {
        self.require_facilitator("remove markers")?;
        if self.picked.as_ref() == Some(marker_id) {
            self.picked = None;
        }
        self.dispatch(Action::RemoveMarker(marker_id.clone()));
        Ok(())
    }

    /// First half of a drag: remembers the marker, changes nothing.
    pub fn pick_marker(&mut self, marker_id: &MarkerId) -> Result<(), SessionError> {
        if self.state.marker(marker_id).is_none() {
            return Err(SessionError::UnknownMarker(marker_id.clone()));
        }
        self.picked = Some(marker_id.clone());
        Ok(())
    }

    pub fn picked_marker(&self) -> Option<&MarkerId> {
        self.picked.as_ref()
    }

    /// Second half of a drag: writes the final position once.
    pub fn drop_marker(&mut self, position: Position) -> Result<(), SessionError> {
        let marker_id = self.picked.take().ok_or(SessionError::NothingPicked)?;
        self.move_marker(&marker_id, position)
    }

    pub fn cancel_pick(&mut self) {
        self.picked = None;
    }

    pub fn export(&self) -> ExportSnapshot<'_> {
        ExportSnapshot::of(&self.state)
    }

    pub fn title(&self) -> &str {
        self.state
            .current_retro()
            .map(|retro| retro.title.as_str())
            .unwrap_or_default()
    }

    fn require_facilitator(&self, capability: &'static str) -> Result<(), SessionError> {
        if self.state.is_facilitator() {
            Ok(())
        } else {
            Err(SessionError::FacilitatorRequired(capability))
        }
    }

    fn require_participant(&self, participant_id: &ParticipantId) -> Result<(), SessionError> {
        if self.state.participant(participant_id).is_some() {
            Ok(())
        } else {
            Err(SessionError::UnknownParticipant(participant_id.clone()))
        }
    }
}

fn session_id_from(location: &Url) -> Option<SessionId> {
    location
        .query_pairs()
        .find(|(key, _)| key == SESSION_QUERY_KEY)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(SessionId::from)
}
