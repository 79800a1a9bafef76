//! Read-only snapshot handed to document exporters, plus the built-in text
//! and JSON renderings of it.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use shared::domain::{Goal, Marker, Participant};
use thiserror::Error;

use crate::{
    queries::{filter_markers_for_goal, participant_name, score_stats, BoardSummary},
    store::RetrospectiveState,
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write export to '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

/// Point-in-time view of the board. Borrowing keeps exporters from
/// mutating the state they render.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExportSnapshot<'a> {
    pub goals: &'a [Goal],
    pub markers: &'a [Marker],
    pub participants: &'a [Participant],
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    title: &'a str,
    summary: BoardSummary,
    #[serde(flatten)]
    snapshot: ExportSnapshot<'a>,
}

impl<'a> ExportSnapshot<'a> {
    pub fn of(state: &'a RetrospectiveState) -> Self {
        Self {
            goals: state.goals(),
            markers: state.markers(),
            participants: state.participants(),
        }
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            goals: self.goals.len(),
            participants: self.participants.len(),
            markers: self.markers.len(),
        }
    }

    pub fn render(&self, title: &str, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Text => Ok(self.render_text(title)),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&JsonDocument {
                title,
                summary: self.summary(),
                snapshot: *self,
            })?),
        }
    }

    pub fn write_to(
        &self,
        path: &Path,
        title: &str,
        format: ExportFormat,
    ) -> Result<(), ExportError> {
        let rendered = self.render(title, format)?;
        fs::write(path, rendered).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn render_text(&self, title: &str) -> String {
        // Writing into a String cannot fail.
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out);

        if self.goals.is_empty() {
            let _ = writeln!(out, "No goals");
            let _ = writeln!(out);
        }

        for (index, goal) in self.goals.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", index + 1, goal.text);
            let markers = filter_markers_for_goal(self.markers, &goal.id);
            if markers.is_empty() {
                let _ = writeln!(out, "  No markers");
            } else {
                for marker in &markers {
                    let unit = if marker.score.value() == 1 { "point" } else { "points" };
                    let _ = writeln!(
                        out,
                        "  • {}: {} {unit}",
                        participant_name(self.participants, &marker.participant_id),
                        marker.score,
                    );
                }
                if let Some(mean) = score_stats(markers.iter().copied()).mean {
                    let _ = writeln!(out, "  Average: {mean:.1}");
                }
            }
            let _ = writeln!(out);
        }

        let summary = self.summary();
        let _ = writeln!(out, "Summary");
        let _ = writeln!(out, "Goals: {}", summary.goals);
        let _ = writeln!(out, "Participants: {}", summary.participants);
        let _ = writeln!(out, "Markers: {}", summary.markers);
        out
    }
}
