//! Data models for the stowage simulation.
//!
//! This module defines the fundamental records tracked on the station:
//! - `Item`: A piece of cargo with dimensions, mass, priority, and lifetime limits
//! - `Position`: Where a stowed item sits inside its container
//! - `Container`: A bounded stowage volume assigned to one zone
//! - `Astronaut`: Static crew reference data
//!
//! `Item` and `Container` implement the `Dimensional` trait from the `types` module.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{BoundingBox, Dimensional, Vec3};

/// Highest allowed item priority.
pub const MAX_PRIORITY: u8 = 100;

/// Validation error for item and container data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid mass: {0}")]
    InvalidMass(String),
    #[error("Invalid priority: {0} (expected 0-100)")]
    InvalidPriority(i64),
    #[error("Unknown zone: '{0}'")]
    InvalidZone(String),
    #[error("Invalid number in {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Invalid date in {field}: '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Unknown {field}: '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// Helper function to validate a single dimension.
fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_dims(dims: Vec3, prefix: &str) -> Result<(), ValidationError> {
    validate_dimension(dims.x, &format!("{prefix}width"))?;
    validate_dimension(dims.y, &format!("{prefix}depth"))?;
    validate_dimension(dims.z, &format!("{prefix}height"))?;
    Ok(())
}

fn validate_mass(value: f64) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidMass(format!(
            "Mass must be positive, got: {}",
            value
        )));
    }
    Ok(())
}

fn validate_identifier(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Parses a calendar date from `YYYY-MM-DD`, a civil datetime, or an RFC 3339
/// timestamp. Timestamps are reduced to their UTC calendar date.
pub fn parse_calendar_date(field: &'static str, raw: &str) -> Result<Date, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(date) = trimmed.parse::<Date>() {
        return Ok(date);
    }
    if let Ok(timestamp) = trimmed.parse::<Timestamp>() {
        return Ok(timestamp.to_zoned(TimeZone::UTC).date());
    }
    if let Ok(datetime) = trimmed.parse::<DateTime>() {
        return Ok(datetime.date());
    }
    Err(ValidationError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

/// Fixed categories of station locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Zone {
    #[serde(rename = "Crew Quarters")]
    CrewQuarters,
    #[serde(rename = "Airlock")]
    Airlock,
    #[serde(rename = "Laboratory")]
    Laboratory,
    #[serde(rename = "Storage Bay")]
    StorageBay,
    #[serde(rename = "Medical Bay")]
    MedicalBay,
    #[serde(rename = "Command Center")]
    CommandCenter,
}

impl Zone {
    pub const ALL: [Zone; 6] = [
        Zone::CrewQuarters,
        Zone::Airlock,
        Zone::Laboratory,
        Zone::StorageBay,
        Zone::MedicalBay,
        Zone::CommandCenter,
    ];

    /// Display name, identical to the interchange spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::CrewQuarters => "Crew Quarters",
            Zone::Airlock => "Airlock",
            Zone::Laboratory => "Laboratory",
            Zone::StorageBay => "Storage Bay",
            Zone::MedicalBay => "Medical Bay",
            Zone::CommandCenter => "Command Center",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = ValidationError;

    /// Case-insensitive; spaces, dashes and underscores are interchangeable.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Zone::ALL
            .into_iter()
            .find(|zone| zone.as_str().replace(' ', "").to_ascii_lowercase() == normalized)
            .ok_or_else(|| ValidationError::InvalidZone(raw.to_string()))
    }
}

/// Why an item became waste.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum WasteReason {
    #[serde(rename = "Expired")]
    Expired,
    #[serde(rename = "Out of Uses")]
    OutOfUses,
    #[serde(rename = "Manually Marked")]
    ManuallyMarked,
}

impl WasteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteReason::Expired => "Expired",
            WasteReason::OutOfUses => "Out of Uses",
            WasteReason::ManuallyMarked => "Manually Marked",
        }
    }
}

impl fmt::Display for WasteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a stowed item: container plus the origin of its bounding box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub container_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(container_id: impl Into<String>, origin: Vec3) -> Self {
        Self {
            container_id: container_id.into(),
            x: origin.x,
            y: origin.y,
            z: origin.z,
        }
    }

    /// Converts the origin to a Vec3.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A piece of cargo.
///
/// `is_waste` only ever goes from `false` to `true`, always together with
/// `waste_reason`; use [`Item::mark_waste`] rather than writing the fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "item1",
    "name": "Food Package",
    "width": 10.0, "depth": 10.0, "height": 20.0,
    "mass": 5.0,
    "priority": 80,
    "expiryDate": "2025-05-20",
    "usageLimit": 30,
    "usageCount": 5,
    "preferredZone": "Crew Quarters",
    "isWaste": false,
    "position": { "containerId": "container1", "x": 0.0, "y": 0.0, "z": 0.0 }
}))]
pub struct Item {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub mass: f64,
    pub priority: u8,
    #[schema(value_type = Option<String>, example = "2025-06-01")]
    pub expiry_date: Option<Date>,
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    pub preferred_zone: Zone,
    #[serde(default)]
    pub is_waste: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_reason: Option<WasteReason>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl Item {
    /// Creates a new unstowed, active item with validation.
    ///
    /// # Parameters
    /// * `id` - Unique identifier
    /// * `name` - Display name
    /// * `dims` - Dimensions (width, depth, height) in centimeters
    /// * `mass` - Mass in kg
    /// * `priority` - 0 to 100, higher is more critical
    /// * `preferred_zone` - Zone the item should be stowed in
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dims: Vec3,
        mass: f64,
        priority: u8,
        preferred_zone: Zone,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id: id.into(),
            name: name.into(),
            width: dims.x,
            depth: dims.y,
            height: dims.z,
            mass,
            priority,
            expiry_date: None,
            usage_limit: None,
            usage_count: 0,
            preferred_zone,
            is_waste: false,
            waste_reason: None,
            position: None,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn with_expiry(mut self, expiry_date: Date) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_usage(mut self, usage_limit: Option<u32>, usage_count: u32) -> Self {
        self.usage_limit = usage_limit;
        self.usage_count = usage_count;
        self
    }

    #[cfg(test)]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Re-checks the invariants of an item that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.id, "id")?;
        validate_dims(self.dimensions(), "")?;
        validate_mass(self.mass)?;
        if self.priority > MAX_PRIORITY {
            return Err(ValidationError::InvalidPriority(i64::from(self.priority)));
        }
        Ok(())
    }

    /// `true` once the expiry date is on or before `date`. Items without
    /// expiry never expire.
    pub fn is_expired_on(&self, date: Date) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= date)
    }

    /// `true` when a usage limit exists and has been reached.
    pub fn is_depleted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
    }

    /// Uses left before depletion, `None` for unlimited items.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.usage_limit
            .map(|limit| limit.saturating_sub(self.usage_count))
    }

    /// Counts one use.
    pub fn record_use(&mut self) {
        self.usage_count = self.usage_count.saturating_add(1);
    }

    /// Flags the item as waste. Returns `false` if it already was.
    pub fn mark_waste(&mut self, reason: WasteReason) -> bool {
        if self.is_waste {
            return false;
        }
        self.is_waste = true;
        self.waste_reason = Some(reason);
        true
    }

    /// Reason reported for a waste item. Items flagged without a recorded
    /// reason fall back to what their state implies.
    pub fn effective_waste_reason(&self, date: Date) -> Option<WasteReason> {
        if !self.is_waste {
            return None;
        }
        Some(self.waste_reason.unwrap_or(if self.is_expired_on(date) {
            WasteReason::Expired
        } else if self.is_depleted() {
            WasteReason::OutOfUses
        } else {
            WasteReason::ManuallyMarked
        }))
    }

    pub fn container_id(&self) -> Option<&str> {
        self.position.as_ref().map(|p| p.container_id.as_str())
    }

    pub fn is_in_container(&self, container_id: &str) -> bool {
        self.container_id() == Some(container_id)
    }

    /// Bounding box of a stowed item, `None` while in hand.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.position
            .as_ref()
            .map(|p| BoundingBox::new(p.origin(), self.dimensions()))
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.width, self.depth, self.height)
    }
}

/// A stowage container.
///
/// `space_utilization` and `item_ids` are derived from the item collection by
/// the `space` module and never assigned directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub zone: Zone,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    #[serde(default)]
    pub space_utilization: u8,
    #[serde(default)]
    pub item_ids: Vec<String>,
}

impl Container {
    /// Creates a new empty container with validation.
    pub fn new(id: impl Into<String>, zone: Zone, dims: Vec3) -> Result<Self, ValidationError> {
        let container = Self {
            id: id.into(),
            zone,
            width: dims.x,
            depth: dims.y,
            height: dims.z,
            space_utilization: 0,
            item_ids: Vec::new(),
        };
        container.validate()?;
        Ok(container)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier(&self.id, "containerId")?;
        validate_dims(self.dimensions(), "container ")
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.width, self.depth, self.height)
    }
}

/// Crew member reference data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Astronaut {
    pub id: String,
    pub name: String,
    pub role: String,
    pub avatar: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn sample_item() -> Item {
        Item::new(
            "item1",
            "Food Package",
            Vec3::new(10.0, 10.0, 20.0),
            5.0,
            80,
            Zone::CrewQuarters,
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_positive_dimensions_and_mass() {
        let bad_dim = Item::new("a", "A", Vec3::new(0.0, 1.0, 1.0), 1.0, 1, Zone::Airlock);
        assert!(matches!(bad_dim, Err(ValidationError::InvalidDimension(_))));

        let bad_mass = Item::new("a", "A", Vec3::new(1.0, 1.0, 1.0), -2.0, 1, Zone::Airlock);
        assert!(matches!(bad_mass, Err(ValidationError::InvalidMass(_))));

        let bad_priority = Item::new("a", "A", Vec3::new(1.0, 1.0, 1.0), 1.0, 101, Zone::Airlock);
        assert!(matches!(bad_priority, Err(ValidationError::InvalidPriority(101))));

        let bad_container = Container::new("c", Zone::Airlock, Vec3::new(10.0, -1.0, 10.0));
        assert!(bad_container.is_err());
    }

    #[test]
    fn zone_parses_interchange_spellings() {
        assert_eq!("Crew Quarters".parse::<Zone>().unwrap(), Zone::CrewQuarters);
        assert_eq!("storage_bay".parse::<Zone>().unwrap(), Zone::StorageBay);
        assert_eq!(" medical-bay ".parse::<Zone>().unwrap(), Zone::MedicalBay);
        assert!("Engine Room".parse::<Zone>().is_err());
    }

    #[test]
    fn expiry_is_inclusive_and_optional() {
        let item = sample_item().with_expiry(date(2025, 6, 1));
        assert!(!item.is_expired_on(date(2025, 5, 31)));
        assert!(item.is_expired_on(date(2025, 6, 1)));
        assert!(!sample_item().is_expired_on(date(2999, 1, 1)));
    }

    #[test]
    fn depletion_requires_a_limit() {
        let mut limited = sample_item().with_usage(Some(2), 1);
        assert!(!limited.is_depleted());
        assert_eq!(limited.remaining_uses(), Some(1));
        limited.record_use();
        assert!(limited.is_depleted());
        assert_eq!(limited.remaining_uses(), Some(0));

        let unlimited = sample_item().with_usage(None, 10_000);
        assert!(!unlimited.is_depleted());
        assert_eq!(unlimited.remaining_uses(), None);
    }

    #[test]
    fn mark_waste_is_one_way() {
        let mut item = sample_item();
        assert!(item.mark_waste(WasteReason::Expired));
        assert!(!item.mark_waste(WasteReason::ManuallyMarked));
        assert!(item.is_waste);
        assert_eq!(item.waste_reason, Some(WasteReason::Expired));
    }

    #[test]
    fn parses_dates_and_timestamps() {
        assert_eq!(
            parse_calendar_date("ExpiryDate", "2025-06-01").unwrap(),
            date(2025, 6, 1)
        );
        assert_eq!(
            parse_calendar_date("ExpiryDate", "2025-06-01T23:30:00Z").unwrap(),
            date(2025, 6, 1)
        );
        assert_eq!(
            parse_calendar_date("ExpiryDate", "2025-06-01T08:00:00").unwrap(),
            date(2025, 6, 1)
        );
        assert!(parse_calendar_date("ExpiryDate", "next tuesday").is_err());
    }

    #[test]
    fn item_json_uses_camel_case_fields() {
        let item = sample_item()
            .with_expiry(date(2025, 5, 20))
            .with_position(Position::new("container1", Vec3::zero()));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["preferredZone"], "Crew Quarters");
        assert_eq!(value["expiryDate"], "2025-05-20");
        assert_eq!(value["position"]["containerId"], "container1");
        assert_eq!(value["isWaste"], false);

        let back: Item = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }
}
