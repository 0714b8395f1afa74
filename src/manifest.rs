//! CSV interchange for items, containers and the current arrangement.
//!
//! Column names follow the station manifests (`ItemID`, `Name`, `Width`, ...).
//! Absent expiry dates and usage limits are written as `N/A`. Imports are
//! upserts: a bad row is reported with its 1-based number (header excluded)
//! and the remaining rows are still applied.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::action_log::Actor;
use crate::model::{Container, Item, ValidationError, Zone, parse_calendar_date};
use crate::simulation::{SimulationError, SimulationState};
use crate::types::Vec3;
use crate::waste;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ItemRow {
    #[serde(rename = "ItemID")]
    item_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Width")]
    width: String,
    #[serde(rename = "Depth")]
    depth: String,
    #[serde(rename = "Height")]
    height: String,
    #[serde(rename = "Mass")]
    mass: String,
    #[serde(rename = "Priority")]
    priority: String,
    #[serde(rename = "ExpiryDate")]
    expiry_date: String,
    #[serde(rename = "UsageLimit")]
    usage_limit: String,
    #[serde(rename = "UsageCount")]
    usage_count: String,
    #[serde(rename = "PreferredZone")]
    preferred_zone: String,
}

impl ItemRow {
    fn from_item(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            width: item.width.to_string(),
            depth: item.depth.to_string(),
            height: item.height.to_string(),
            mass: item.mass.to_string(),
            priority: item.priority.to_string(),
            expiry_date: item
                .expiry_date
                .map_or_else(|| NOT_AVAILABLE.to_string(), |date| date.to_string()),
            usage_limit: item
                .usage_limit
                .map_or_else(|| NOT_AVAILABLE.to_string(), |limit| limit.to_string()),
            usage_count: item.usage_count.to_string(),
            preferred_zone: item.preferred_zone.to_string(),
        }
    }

    fn into_item(self) -> Result<Item, ValidationError> {
        let id = if self.item_id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            self.item_id.trim().to_string()
        };
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("Name"));
        }
        let dims = Vec3::new(
            parse_number("Width", &self.width)?,
            parse_number("Depth", &self.depth)?,
            parse_number("Height", &self.height)?,
        );
        let mass = parse_number("Mass", &self.mass)?;
        let priority = parse_priority(&self.priority)?;
        let zone: Zone = self.preferred_zone.parse()?;

        let mut item = Item::new(id, self.name.trim(), dims, mass, priority, zone)?;
        if let Some(raw) = present(&self.expiry_date) {
            item.expiry_date = Some(parse_calendar_date("ExpiryDate", raw)?);
        }
        item.usage_limit = present(&self.usage_limit)
            .map(|raw| parse_count("UsageLimit", raw))
            .transpose()?;
        item.usage_count = present(&self.usage_count)
            .map(|raw| parse_count("UsageCount", raw))
            .transpose()?
            .unwrap_or(0);
        Ok(item)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ContainerRow {
    #[serde(rename = "ContainerID")]
    container_id: String,
    #[serde(rename = "Zone")]
    zone: String,
    #[serde(rename = "Width")]
    width: String,
    #[serde(rename = "Depth")]
    depth: String,
    #[serde(rename = "Height")]
    height: String,
}

impl ContainerRow {
    fn from_container(container: &Container) -> Self {
        Self {
            container_id: container.id.clone(),
            zone: container.zone.to_string(),
            width: container.width.to_string(),
            depth: container.depth.to_string(),
            height: container.height.to_string(),
        }
    }

    fn into_container(self) -> Result<Container, ValidationError> {
        let id = if self.container_id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            self.container_id.trim().to_string()
        };
        let zone: Zone = self.zone.parse()?;
        let dims = Vec3::new(
            parse_number("Width", &self.width)?,
            parse_number("Depth", &self.depth)?,
            parse_number("Height", &self.height)?,
        );
        Container::new(id, zone, dims)
    }
}

#[derive(Serialize)]
struct ArrangementRow {
    #[serde(rename = "Item ID")]
    item_id: String,
    #[serde(rename = "Container ID")]
    container_id: String,
    #[serde(rename = "Coordinates (W1,D1,H1)")]
    start: String,
    #[serde(rename = "Coordinates (W2,D2,H2)")]
    end: String,
}

fn present(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NOT_AVAILABLE)).then_some(trimmed)
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

fn parse_priority(raw: &str) -> Result<u8, ValidationError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field: "Priority",
            value: raw.to_string(),
        })?;
    u8::try_from(value)
        .ok()
        .filter(|p| *p <= crate::model::MAX_PRIORITY)
        .ok_or(ValidationError::InvalidPriority(value))
}

/// A row that could not be imported.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct RowError {
    /// 1-based, header excluded
    pub row: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<RowError>,
    /// Imported items that were already expired or used up
    pub flagged_as_waste: Vec<String>,
    /// Stowed items taken out because they no longer fit their container
    pub unstowed: Vec<String>,
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn parse_rows<R, T>(
    text: &str,
    convert: impl Fn(R) -> Result<T, ValidationError>,
) -> Result<(Vec<T>, Vec<RowError>), SimulationError>
where
    R: serde::de::DeserializeOwned,
{
    let mut reader = reader(text);
    reader.headers()?;

    let mut parsed = Vec::new();
    let mut errors = Vec::new();
    for (index, record) in reader.deserialize::<R>().enumerate() {
        let row = index + 1;
        let outcome = record
            .map_err(|err| err.to_string())
            .and_then(|raw| convert(raw).map_err(|err| err.to_string()));
        match outcome {
            Ok(value) => parsed.push(value),
            Err(message) => {
                warn!(target: "stowage.manifest", row, %message, "row rejected");
                errors.push(RowError { row, message });
            }
        }
    }
    Ok((parsed, errors))
}

/// Imports items from CSV text.
///
/// Known ids keep their position, usage history and waste flag; the other
/// columns are replaced. A stowed item that grows past its container's walls
/// is taken out. New items arrive unstowed. Afterwards every item is checked
/// for expiry and depletion against the current date.
pub fn import_items(
    state: &mut SimulationState,
    text: &str,
    actor: &Actor,
) -> Result<ImportReport, SimulationError> {
    let (items, errors) = parse_rows(text, ItemRow::into_item)?;
    let imported = items.len();

    for incoming in items {
        match state.items.iter_mut().find(|item| item.id == incoming.id) {
            Some(existing) => {
                existing.name = incoming.name;
                existing.width = incoming.width;
                existing.depth = incoming.depth;
                existing.height = incoming.height;
                existing.mass = incoming.mass;
                existing.priority = incoming.priority;
                existing.expiry_date = incoming.expiry_date;
                existing.usage_limit = incoming.usage_limit;
                existing.usage_count = existing.usage_count.max(incoming.usage_count);
                existing.preferred_zone = incoming.preferred_zone;
            }
            None => state.items.push(incoming),
        }
    }
    let unstowed = state.unstow_misfits(actor);
    state.refresh_all();
    let flagged = waste::sweep(state, &actor.as_system());

    info!(
        target: "stowage.manifest",
        imported,
        rejected = errors.len(),
        flagged = flagged.len(),
        unstowed = unstowed.len(),
        "items imported"
    );
    Ok(ImportReport {
        imported,
        errors,
        flagged_as_waste: flagged.into_iter().map(|r| r.item_id).collect(),
        unstowed,
    })
}

/// Imports containers from CSV text. Utilization is recomputed, never read.
/// Items that no longer fit a shrunken container are taken out.
pub fn import_containers(
    state: &mut SimulationState,
    text: &str,
    actor: &Actor,
) -> Result<ImportReport, SimulationError> {
    let (containers, errors) = parse_rows(text, ContainerRow::into_container)?;
    let imported = containers.len();
    let unstowed = state.upsert_containers(containers, actor);

    info!(
        target: "stowage.manifest",
        imported,
        rejected = errors.len(),
        unstowed = unstowed.len(),
        "containers imported"
    );
    Ok(ImportReport {
        imported,
        errors,
        flagged_as_waste: Vec::new(),
        unstowed,
    })
}

fn write_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String, SimulationError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn export_items(items: &[Item]) -> Result<String, SimulationError> {
    write_rows(items.iter().map(ItemRow::from_item))
}

pub fn export_containers(containers: &[Container]) -> Result<String, SimulationError> {
    write_rows(containers.iter().map(ContainerRow::from_container))
}

/// One row per stowed item with its opposite corners.
pub fn export_arrangement(items: &[Item]) -> Result<String, SimulationError> {
    write_rows(items.iter().filter_map(|item| {
        let position = item.position.as_ref()?;
        let bbox = item.bounding_box()?;
        Some(ArrangementRow {
            item_id: item.id.clone(),
            container_id: position.container_id.clone(),
            start: format!("({},{},{})", bbox.min.x, bbox.min.y, bbox.min.z),
            end: format!("({},{},{})", bbox.max.x, bbox.max.y, bbox.max.z),
        })
    }))
}
