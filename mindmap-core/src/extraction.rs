use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{MindMapError, Result};

/// Reserved group for key points carrying no context label.
pub const GENERAL_CONTEXT: &str = "General";
/// Placeholder shown while the upstream exchange is still streaming.
pub const LOADING_LABEL: &str = "Loading...";
/// Root label when a completed extraction carries no title.
pub const UNTITLED_LABEL: &str = "Untitled Document";
/// Leaf label when a completed extraction left a point empty.
pub const EMPTY_POINT_LABEL: &str = "No content";

pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_POINT_CHARS: usize = 1000;
pub const MAX_CONTEXT_CHARS: usize = 500;
pub const MAX_KEY_POINTS: usize = 50;

/// One extracted fact. Both fields may be absent while streaming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub point: Option<String>,
    pub context: Option<String>,
}

impl KeyPoint {
    pub fn new(point: impl Into<String>) -> Self {
        Self {
            point: Some(point.into()),
            context: None,
        }
    }

    pub fn with_context(point: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            point: Some(point.into()),
            context: Some(context.into()),
        }
    }

    /// The group this point belongs to; absent context maps to "General".
    pub fn context_label(&self) -> &str {
        self.context.as_deref().unwrap_or(GENERAL_CONTEXT)
    }
}

/// Raw cumulative payload from one upstream snapshot.
///
/// Each arrival represents the whole extraction so far, not a delta. A
/// trailing entry that is still `null` mid-stream normalizes to an empty
/// `KeyPoint` rather than being dropped, so leaf indices stay aligned with
/// the underlying sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSnapshot {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable_key_points")]
    pub key_points: Vec<KeyPoint>,
}

fn nullable_key_points<'de, D>(deserializer: D) -> std::result::Result<Vec<KeyPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<KeyPoint>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(Option::unwrap_or_default).collect())
}

impl ExtractionSnapshot {
    /// Schema validation for a *final* snapshot. Partial snapshots are not
    /// validated; they exist only to drive incremental rendering.
    pub fn validate(&self) -> Result<()> {
        let title = self
            .title
            .as_deref()
            .ok_or_else(|| MindMapError::ValidationFailure("Title is required".into()))?;
        if title.trim().is_empty() {
            return Err(MindMapError::ValidationFailure(
                "Title cannot be empty".into(),
            ));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(MindMapError::ValidationFailure("Title is too long".into()));
        }

        if self.key_points.is_empty() {
            return Err(MindMapError::ValidationFailure(
                "At least one key point is required".into(),
            ));
        }
        if self.key_points.len() > MAX_KEY_POINTS {
            return Err(MindMapError::ValidationFailure(
                "Too many key points".into(),
            ));
        }

        for kp in &self.key_points {
            let point = kp
                .point
                .as_deref()
                .ok_or_else(|| MindMapError::ValidationFailure("Point cannot be empty".into()))?;
            if point.trim().is_empty() {
                return Err(MindMapError::ValidationFailure(
                    "Point cannot be empty".into(),
                ));
            }
            if point.chars().count() > MAX_POINT_CHARS {
                return Err(MindMapError::ValidationFailure("Point is too long".into()));
            }
            if let Some(context) = &kp.context {
                if context.trim().is_empty() {
                    return Err(MindMapError::ValidationFailure(
                        "Context cannot be empty".into(),
                    ));
                }
                if context.chars().count() > MAX_CONTEXT_CHARS {
                    return Err(MindMapError::ValidationFailure(
                        "Context is too long".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Where the one in-flight exchange currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPhase {
    /// Snapshots may still arrive; absent fields render as loading.
    Streaming,
    /// Terminal; the held snapshot passed validation.
    Complete,
    /// Terminal; partial state was discarded.
    Failed,
}

/// Normalized extraction as the builder consumes it: the latest cumulative
/// snapshot plus the phase that decides how absent fields are labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionState {
    pub snapshot: ExtractionSnapshot,
    pub phase: ExtractionPhase,
}

impl ExtractionState {
    pub fn streaming(snapshot: ExtractionSnapshot) -> Self {
        Self {
            snapshot,
            phase: ExtractionPhase::Streaming,
        }
    }

    pub fn complete(snapshot: ExtractionSnapshot) -> Self {
        Self {
            snapshot,
            phase: ExtractionPhase::Complete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.key_points.is_empty()
    }

    /// Root label with phase-aware defaulting.
    pub fn root_label(&self) -> String {
        match (&self.snapshot.title, self.phase) {
            (Some(title), _) => title.clone(),
            (None, ExtractionPhase::Streaming) => LOADING_LABEL.to_string(),
            (None, _) => UNTITLED_LABEL.to_string(),
        }
    }

    /// Leaf label for one key point with phase-aware defaulting.
    pub fn point_label(&self, kp: &KeyPoint) -> String {
        match (&kp.point, self.phase) {
            (Some(point), _) => point.clone(),
            (None, ExtractionPhase::Streaming) => LOADING_LABEL.to_string(),
            (None, _) => EMPTY_POINT_LABEL.to_string(),
        }
    }
}

impl Default for ExtractionState {
    fn default() -> Self {
        Self::streaming(ExtractionSnapshot::default())
    }
}
