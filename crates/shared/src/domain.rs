use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh collision-improbable id (UUID v4).
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(SessionId);
id_newtype!(ParticipantId);
id_newtype!(GoalId);
id_newtype!(MarkerId);

/// Selectable marker and participant colors, in display order.
pub const PALETTE: [&str; 12] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#06b6d4", "#3b82f6", "#8b5cf6", "#ec4899",
    "#f59e0b", "#10b981", "#6366f1", "#84cc16",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn palette() -> impl Iterator<Item = Color> {
        PALETTE.iter().map(|hex| Color::new(*hex))
    }

    pub fn is_in_palette(&self) -> bool {
        PALETTE.contains(&self.0.as_str())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(PALETTE[0])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A marker score. Only `Score::MIN..=Score::MAX` is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::ScoreOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Score> {
        (Self::MIN..=Self::MAX).map(Score)
    }
}

impl TryFrom<u8> for Score {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize)]
struct RawPosition {
    x: f64,
    y: f64,
}

/// Percentage coordinates relative to the board bounds, both in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const CENTER: Position = Position { x: 50.0, y: 50.0 };

    pub fn new(x: f64, y: f64) -> Result<Self, DomainError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if in_range(x) && in_range(y) {
            Ok(Self { x, y })
        } else {
            Err(DomainError::PositionOutOfRange { x, y })
        }
    }

    /// Converts a pointer location in board pixels into clamped percentages.
    pub fn from_board_point(
        px: f64,
        py: f64,
        width: f64,
        height: f64,
    ) -> Result<Self, DomainError> {
        let drawable = |v: f64| v.is_finite() && v > 0.0;
        if !drawable(width) || !drawable(height) || !px.is_finite() || !py.is_finite() {
            return Err(DomainError::InvalidBoardSize { width, height });
        }
        Ok(Self {
            x: (px / width * 100.0).clamp(0.0, 100.0),
            y: (py / height * 100.0).clamp(0.0, 100.0),
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::CENTER
    }
}

impl TryFrom<RawPosition> for Position {
    type Error = DomainError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Self::new(raw.x, raw.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub color: Color,
}

impl Participant {
    pub fn new(name: &str, color: Color) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::EmptyName);
        }
        Ok(Self {
            id: ParticipantId::generate(),
            name: name.to_string(),
            color,
        })
    }
}

/// A goal as stored. Its markers live in the store and are joined on read,
/// see [`NestedGoal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub text: String,
}

impl Goal {
    pub fn new(text: &str) -> Result<Self, DomainError> {
        Ok(Self {
            id: GoalId::generate(),
            text: checked_goal_text(text)?,
        })
    }

    pub fn with_text(&self, text: &str) -> Result<Self, DomainError> {
        Ok(Self {
            id: self.id.clone(),
            text: checked_goal_text(text)?,
        })
    }
}

fn checked_goal_text(text: &str) -> Result<String, DomainError> {
    let text = text.trim();
    if text.is_empty() {
        Err(DomainError::EmptyGoalText)
    } else {
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub participant_id: ParticipantId,
    pub goal_id: GoalId,
    pub score: Score,
    #[serde(default)]
    pub position: Position,
    pub color: Color,
}

impl Marker {
    /// New marker placed at the board center.
    pub fn new(
        participant_id: ParticipantId,
        goal_id: GoalId,
        score: Score,
        color: Color,
    ) -> Self {
        Self {
            id: MarkerId::generate(),
            participant_id,
            goal_id,
            score,
            position: Position::CENTER,
            color,
        }
    }

    pub fn moved_to(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

/// Denormalized goal carrying its markers, as exchanged in a
/// [`Retrospective`] document and rendered by goal cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedGoal {
    #[serde(flatten)]
    pub goal: Goal,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrospective {
    pub id: SessionId,
    pub title: String,
    #[serde(default)]
    pub goals: Vec<NestedGoal>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Retrospective {
    /// Empty, active retrospective stamped with the current time.
    pub fn new(id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            goals: Vec::new(),
            participants: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_accepts_only_one_through_eight() {
        assert_eq!(Score::all().map(u8::from).collect::<Vec<_>>(), (1..=8).collect::<Vec<_>>());
        assert_eq!(Score::new(0), Err(DomainError::ScoreOutOfRange(0)));
        assert_eq!(Score::new(9), Err(DomainError::ScoreOutOfRange(9)));
        assert_eq!(Score::new(5).expect("score").value(), 5);
    }

    #[test]
    fn score_rejects_out_of_range_on_deserialize() {
        assert!(serde_json::from_str::<Score>("9").is_err());
        assert_eq!(serde_json::from_str::<Score>("3").expect("score").value(), 3);
    }

    #[test]
    fn palette_is_fixed_and_enumerable() {
        let colors: Vec<_> = Color::palette().collect();
        assert_eq!(colors.len(), 12);
        assert!(colors.iter().all(Color::is_in_palette));
        assert!(!Color::new("#000000").is_in_palette());
        assert_eq!(Color::default().as_str(), "#ef4444");
    }

    #[test]
    fn position_validates_board_bounds() {
        assert!(Position::new(0.0, 100.0).is_ok());
        assert!(Position::new(100.1, 50.0).is_err());
        assert!(Position::new(f64::NAN, 50.0).is_err());
        assert_eq!(Position::default(), Position::CENTER);
        assert!(serde_json::from_str::<Position>(r#"{"x":120.0,"y":5.0}"#).is_err());
    }

    #[test]
    fn board_point_converts_to_clamped_percentages() {
        let pos = Position::from_board_point(100.0, 300.0, 400.0, 400.0).expect("position");
        assert_eq!((pos.x(), pos.y()), (25.0, 75.0));

        let outside = Position::from_board_point(-10.0, 500.0, 400.0, 400.0).expect("position");
        assert_eq!((outside.x(), outside.y()), (0.0, 100.0));

        assert!(Position::from_board_point(10.0, 10.0, 0.0, 400.0).is_err());
    }

    #[test]
    fn participant_and_goal_reject_blank_text() {
        assert_eq!(
            Participant::new("   ", Color::default()),
            Err(DomainError::EmptyName)
        );
        assert_eq!(Goal::new("\t"), Err(DomainError::EmptyGoalText));

        let participant = Participant::new("  Ana ", Color::default()).expect("participant");
        assert_eq!(participant.name, "Ana");

        let goal = Goal::new("Improve testing").expect("goal");
        let renamed = goal.with_text(" Ship weekly ").expect("rename");
        assert_eq!(renamed.id, goal.id);
        assert_eq!(renamed.text, "Ship weekly");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(MarkerId::generate(), MarkerId::generate());
        assert_eq!(GoalId::from("g-1").to_string(), "g-1");
    }

    #[test]
    fn new_marker_starts_at_center() {
        let marker = Marker::new(
            ParticipantId::from("p"),
            GoalId::from("g"),
            Score::new(4).expect("score"),
            Color::default(),
        );
        assert_eq!(marker.position, Position::CENTER);
        let moved = marker.moved_to(Position::new(80.0, 20.0).expect("position"));
        assert_eq!(moved.id, marker.id);
        assert_eq!(moved.score, marker.score);
    }
}
