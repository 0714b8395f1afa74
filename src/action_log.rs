//! Append-only audit trail of state-changing operations.
//!
//! Entries are stored in commit order and never edited or removed. Readers
//! can filter them or walk them newest-first for display.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::ValidationError;

/// Kind of operation an entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Placement,
    Retrieval,
    Rearrangement,
    WasteMarking,
    Undocking,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Placement => "placement",
            ActionKind::Retrieval => "retrieval",
            ActionKind::Rearrangement => "rearrangement",
            ActionKind::WasteMarking => "waste-marking",
            ActionKind::Undocking => "undocking",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "placement" => Ok(ActionKind::Placement),
            "retrieval" => Ok(ActionKind::Retrieval),
            "rearrangement" => Ok(ActionKind::Rearrangement),
            "waste-marking" | "waste_marking" => Ok(ActionKind::WasteMarking),
            "undocking" => Ok(ActionKind::Undocking),
            _ => Err(ValidationError::UnknownValue {
                field: "actionType",
                value: raw.to_string(),
            }),
        }
    }
}

/// Who performs an operation and when.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub astronaut_id: String,
    /// Explicit timestamp; the wall clock is used when absent
    pub timestamp: Option<Timestamp>,
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    pub fn new(astronaut_id: impl Into<String>) -> Self {
        Self {
            astronaut_id: astronaut_id.into(),
            timestamp: None,
        }
    }

    /// Engine-initiated actor.
    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ID)
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The system actor, sharing this actor's timestamp.
    pub fn as_system(&self) -> Self {
        Self {
            astronaut_id: Self::SYSTEM_ID.to_string(),
            timestamp: self.timestamp,
        }
    }

    fn stamp(&self) -> Timestamp {
        self.timestamp.unwrap_or_else(Timestamp::now)
    }
}

/// A single audit record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = String, example = "2025-06-01T08:00:00Z")]
    pub timestamp: Timestamp,
    pub astronaut: String,
    pub action: ActionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

/// Optional filters for log queries; all given filters must match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogFilter {
    /// Inclusive lower bound
    pub start: Option<Timestamp>,
    /// Inclusive upper bound
    pub end: Option<Timestamp>,
    pub item_id: Option<String>,
    pub astronaut_id: Option<String>,
    pub action: Option<ActionKind>,
}

impl LogFilter {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.start.is_none_or(|start| entry.timestamp >= start)
            && self.end.is_none_or(|end| entry.timestamp <= end)
            && self
                .item_id
                .as_deref()
                .is_none_or(|id| entry.item_id.as_deref() == Some(id))
            && self
                .astronaut_id
                .as_deref()
                .is_none_or(|id| entry.astronaut == id)
            && self.action.is_none_or(|action| entry.action == action)
    }
}

/// Append-only log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns it.
    pub fn record(
        &mut self,
        actor: &Actor,
        action: ActionKind,
        description: impl Into<String>,
        item_id: Option<&str>,
        container_id: Option<&str>,
    ) -> &LogEntry {
        self.entries.push(LogEntry {
            id: Uuid::new_v4(),
            timestamp: actor.stamp(),
            astronaut: actor.astronaut_id.clone(),
            action,
            description: description.into(),
            item_id: item_id.map(str::to_string),
            container_id: container_id.map(str::to_string),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    /// Entries matching `filter`, in insertion order or reversed.
    pub fn query(&self, filter: &LogFilter, newest_first: bool) -> Vec<&LogEntry> {
        if newest_first {
            self.newest_first().filter(|e| filter.matches(e)).collect()
        } else {
            self.entries.iter().filter(|e| filter.matches(e)).collect()
        }
    }
}

#[cfg(test)]
impl ActionLog {
    /// Entries in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
