//! Memory record model and category enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of memory categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    /// Stable fact about the user.
    Fact,
    /// Like or dislike.
    Preference,
    /// Something that happened.
    Event,
    /// Correction of an earlier memory.
    Correction,
    /// Situational context.
    Context,
}

/// Error for category strings outside the closed enumeration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown memory category: {0}")]
pub struct UnknownCategory(pub String);

impl MemoryCategory {
    /// Every category, in declaration order.
    pub const ALL: [MemoryCategory; 5] = [
        MemoryCategory::Fact,
        MemoryCategory::Preference,
        MemoryCategory::Event,
        MemoryCategory::Correction,
        MemoryCategory::Context,
    ];

    /// Return the category as a lowercase wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Fact => "fact",
            MemoryCategory::Preference => "preference",
            MemoryCategory::Event => "event",
            MemoryCategory::Correction => "correction",
            MemoryCategory::Context => "context",
        }
    }

    /// Human-readable label in the companion's operating language.
    pub fn label(&self) -> &'static str {
        match self {
            MemoryCategory::Fact => "事实",
            MemoryCategory::Preference => "偏好",
            MemoryCategory::Event => "事件",
            MemoryCategory::Correction => "纠正",
            MemoryCategory::Context => "上下文",
        }
    }

    /// Parse a wire string; values outside the enumeration are rejected.
    pub fn parse(value: &str) -> Result<Self, UnknownCategory> {
        match value {
            "fact" => Ok(MemoryCategory::Fact),
            "preference" => Ok(MemoryCategory::Preference),
            "event" => Ok(MemoryCategory::Event),
            "correction" => Ok(MemoryCategory::Correction),
            "context" => Ok(MemoryCategory::Context),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MemoryCategory::parse(value)
    }
}

/// Clamp an importance value into the valid 1..=10 range.
pub fn clamp_importance(value: i64) -> u8 {
    value.clamp(1, 10) as u8
}

/// Durable unit of long-term knowledge about the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier; immutable and never reused.
    pub id: Uuid,
    /// Free-text content.
    pub content: String,
    /// Memory category.
    pub category: MemoryCategory,
    /// Importance, always within 1..=10.
    pub importance: u8,
    /// Keywords derived from content at write time; search aid only.
    pub keywords: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last successful recall timestamp.
    pub last_accessed_at: DateTime<Utc>,
    /// Number of successful recalls.
    pub access_count: u32,
    /// Validity flag; invalidated records are hidden from queries.
    pub valid: bool,
    /// Optional free-form metadata.
    pub metadata: serde_json::Value,
}

/// Partial update applied to an existing record.
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdate {
    /// Replacement content; keywords are recomputed when set.
    pub content: Option<String>,
    /// Replacement importance, clamped on write.
    pub importance: Option<u8>,
    /// Replacement category.
    pub category: Option<MemoryCategory>,
    /// Replacement validity flag.
    pub valid: Option<bool>,
}

impl MemoryUpdate {
    /// Whether the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.importance.is_none()
            && self.category.is_none()
            && self.valid.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryCategory, MemoryUpdate, clamp_importance};
    use pretty_assertions::assert_eq;

    #[test]
    fn category_parses_only_closed_set() {
        assert_eq!(MemoryCategory::parse("fact"), Ok(MemoryCategory::Fact));
        assert_eq!(
            MemoryCategory::parse("preference"),
            Ok(MemoryCategory::Preference)
        );
        assert!(MemoryCategory::parse("mood").is_err());
        assert!(MemoryCategory::parse("FACT").is_err());
    }

    #[test]
    fn category_labels_are_human_readable() {
        assert_eq!(MemoryCategory::Preference.label(), "偏好");
        assert_eq!(MemoryCategory::Correction.as_str(), "correction");
    }

    #[test]
    fn importance_clamps_into_range() {
        assert_eq!(clamp_importance(-3), 1);
        assert_eq!(clamp_importance(0), 1);
        assert_eq!(clamp_importance(7), 7);
        assert_eq!(clamp_importance(99), 10);
    }

    #[test]
    fn empty_update_is_detected() {
        assert_eq!(MemoryUpdate::default().is_empty(), true);
        let update = MemoryUpdate {
            importance: Some(5),
            ..MemoryUpdate::default()
        };
        assert_eq!(update.is_empty(), false);
    }
}
