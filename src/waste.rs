//! Waste tracking and simulated time.
//!
//! Items turn into waste when they expire, run out of uses or are marked by
//! hand. The flag is one-way. Advancing time counts scheduled uses day by day
//! and checks expiry once against the final date. Waste leaves the station by
//! being staged into a disposal container, which is then undocked.

use jiff::Span;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::action_log::{ActionKind, Actor};
use crate::model::{Item, WasteReason};
use crate::placement::PlacementRecord;
use crate::retrieval::{RetrievalStep, plan_retrieval};
use crate::simulation::{MoveRecord, SimulationError, SimulationState};
use crate::types::Dimensional;

/// How far to move the simulated date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeSpan {
    Days(u32),
    Until(Date),
}

/// A scheduled daily use, referencing an item by id or exact name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
impl UsageEvent {
    pub fn by_id(item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            item_id: None,
            name: Some(name.into()),
        }
    }
}

impl UsageEvent {
    fn resolve(&self, items: &[Item]) -> Option<usize> {
        if let Some(id) = self.item_id.as_deref() {
            if let Some(index) = items.iter().position(|item| item.id == id) {
                return Some(index);
            }
        }
        let name = self.name.as_deref()?;
        items.iter().position(|item| item.name == name)
    }

    fn label(&self) -> String {
        self.item_id
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }
}

/// Item reference used in reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub item_id: String,
    pub name: String,
}

impl ItemRef {
    fn of(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemUsage {
    pub item_id: String,
    pub name: String,
    pub remaining_uses: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeAdvanceReport {
    #[schema(value_type = String, example = "2025-06-01")]
    pub new_date: Date,
    pub days_advanced: u32,
    /// One entry per counted use, in the order they happened
    pub items_used: Vec<ItemUsage>,
    pub items_expired: Vec<ItemRef>,
    pub items_depleted: Vec<ItemRef>,
    /// Usage references that matched no item
    pub unknown_references: Vec<String>,
}

/// Progress of a running time advance, emitted in commit order.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimulationEvent {
    #[serde(rename_all = "camelCase")]
    DayStarted { day: u32, total_days: u32 },
    ItemUsed(ItemUsage),
    ItemDepleted(ItemRef),
    ItemExpired(ItemRef),
    #[serde(rename_all = "camelCase")]
    Finished {
        #[schema(value_type = String)]
        new_date: Date,
        days_advanced: u32,
    },
}

/// Advances the simulated date.
///
/// # Parameters
/// * `span` - Number of days, or a target date that must not be in the past
/// * `usage` - Uses applied once per simulated day
/// * `actor` - Timestamp source; waste transitions are logged as the system
pub fn advance_time(
    state: &mut SimulationState,
    span: TimeSpan,
    usage: &[UsageEvent],
    actor: &Actor,
) -> Result<TimeAdvanceReport, SimulationError> {
    advance_time_with_progress(state, span, usage, actor, |_| {})
}

/// Like [`advance_time`], reporting every step through `on_event`.
pub fn advance_time_with_progress<F>(
    state: &mut SimulationState,
    span: TimeSpan,
    usage: &[UsageEvent],
    actor: &Actor,
    mut on_event: F,
) -> Result<TimeAdvanceReport, SimulationError>
where
    F: FnMut(SimulationEvent),
{
    let days = days_to_advance(state.current_date, span)?;
    let new_date = state
        .current_date
        .checked_add(Span::new().try_days(i64::from(days))?)?;

    let mut report = TimeAdvanceReport {
        new_date: state.current_date,
        days_advanced: 0,
        items_used: Vec::new(),
        items_expired: Vec::new(),
        items_depleted: Vec::new(),
        unknown_references: Vec::new(),
    };
    if days == 0 {
        on_event(SimulationEvent::Finished {
            new_date: state.current_date,
            days_advanced: 0,
        });
        return Ok(report);
    }

    let mut scheduled = Vec::with_capacity(usage.len());
    for event in usage {
        match event.resolve(&state.items) {
            Some(index) => scheduled.push(index),
            None => report.unknown_references.push(event.label()),
        }
    }

    let system = actor.as_system();
    for day in 1..=days {
        on_event(SimulationEvent::DayStarted {
            day,
            total_days: days,
        });
        for &index in &scheduled {
            let item = &mut state.items[index];
            if item.is_waste {
                continue;
            }
            item.record_use();
            let used = ItemUsage {
                item_id: item.id.clone(),
                name: item.name.clone(),
                remaining_uses: item.remaining_uses(),
            };
            on_event(SimulationEvent::ItemUsed(used.clone()));
            report.items_used.push(used);

            if item.is_depleted() && item.mark_waste(WasteReason::OutOfUses) {
                let depleted = ItemRef::of(item);
                state.logs.record(
                    &system,
                    ActionKind::WasteMarking,
                    format!("Marked {} as waste: {}", depleted.name, WasteReason::OutOfUses),
                    Some(&depleted.item_id),
                    None,
                );
                on_event(SimulationEvent::ItemDepleted(depleted.clone()));
                report.items_depleted.push(depleted);
            }
        }
    }

    state.current_date = new_date;
    for item in state.items.iter_mut() {
        if item.is_waste || !item.is_expired_on(new_date) {
            continue;
        }
        item.mark_waste(WasteReason::Expired);
        let expired = ItemRef::of(item);
        state.logs.record(
            &system,
            ActionKind::WasteMarking,
            format!("Marked {} as waste: {}", expired.name, WasteReason::Expired),
            Some(&expired.item_id),
            None,
        );
        on_event(SimulationEvent::ItemExpired(expired.clone()));
        report.items_expired.push(expired);
    }

    report.new_date = new_date;
    report.days_advanced = days;
    on_event(SimulationEvent::Finished {
        new_date,
        days_advanced: days,
    });
    info!(
        target: "stowage.waste",
        days,
        new_date = %new_date,
        used = report.items_used.len(),
        expired = report.items_expired.len(),
        depleted = report.items_depleted.len(),
        "time advanced"
    );
    Ok(report)
}

fn days_to_advance(current: Date, span: TimeSpan) -> Result<u32, SimulationError> {
    match span {
        TimeSpan::Days(days) => Ok(days),
        TimeSpan::Until(target) => {
            if target < current {
                return Err(SimulationError::TargetDateInPast { target, current });
            }
            let days = current.until(target)?.get_days();
            Ok(u32::try_from(days).unwrap_or(0))
        }
    }
}

/// Flags items that are already expired or used up, without counting uses.
///
/// Used after bulk imports so that imported data never carries an active item
/// that should be waste.
pub fn sweep(state: &mut SimulationState, actor: &Actor) -> Vec<ItemRef> {
    let today = state.current_date;
    let mut flagged = Vec::new();
    for item in state.items.iter_mut() {
        let reason = if item.is_expired_on(today) {
            WasteReason::Expired
        } else if item.is_depleted() {
            WasteReason::OutOfUses
        } else {
            continue;
        };
        if !item.mark_waste(reason) {
            continue;
        }
        state.logs.record(
            actor,
            ActionKind::WasteMarking,
            format!("Marked {} as waste: {}", item.name, reason),
            Some(&item.id),
            None,
        );
        flagged.push(ItemRef::of(item));
    }
    if !flagged.is_empty() {
        debug!(target: "stowage.waste", count = flagged.len(), "sweep flagged items");
    }
    flagged
}

/// Flags an item as waste by hand.
///
/// Returns `false`, without logging, when the item already was waste.
pub fn mark_waste(
    state: &mut SimulationState,
    item_id: &str,
    actor: &Actor,
) -> Result<bool, SimulationError> {
    let index = state.item_index(item_id)?;
    let item = &mut state.items[index];
    if !item.mark_waste(WasteReason::ManuallyMarked) {
        return Ok(false);
    }
    let description = format!("Marked {} as waste: {}", item.name, WasteReason::ManuallyMarked);
    let container = item.container_id().map(str::to_string);
    state.logs.record(
        actor,
        ActionKind::WasteMarking,
        description,
        Some(item_id),
        container.as_deref(),
    );
    Ok(true)
}

/// A waste item and where to find it.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecord {
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    pub container_id: Option<String>,
    pub placement: Option<PlacementRecord>,
}

/// Lists every waste item with its reason. Read-only.
pub fn identify_waste(state: &SimulationState) -> Vec<WasteRecord> {
    state
        .items
        .iter()
        .filter_map(|item| {
            let reason = item.effective_waste_reason(state.current_date)?;
            Some(WasteRecord {
                item_id: item.id.clone(),
                name: item.name.clone(),
                reason,
                container_id: item.container_id().map(str::to_string),
                placement: PlacementRecord::for_item(item),
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    pub mass: f64,
    pub volume: f64,
}

/// Waste selected for one undocking, within a mass budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisposalManifest {
    pub disposal_container_id: String,
    #[schema(value_type = Option<String>)]
    pub undocking_date: Option<Date>,
    pub items: Vec<ManifestItem>,
    pub total_mass: f64,
    pub total_volume: f64,
}

/// Selects waste for the disposal container, lightest first, until the next
/// item would exceed `max_mass`. Ties on mass are broken by id.
pub fn plan_disposal(
    state: &SimulationState,
    disposal_container_id: &str,
    undocking_date: Option<Date>,
    max_mass: f64,
) -> Result<DisposalManifest, SimulationError> {
    state.require_container(disposal_container_id)?;

    let mut candidates: Vec<&Item> = state.items.iter().filter(|item| item.is_waste).collect();
    candidates.sort_by(|a, b| a.mass.total_cmp(&b.mass).then_with(|| a.id.cmp(&b.id)));

    let mut manifest = DisposalManifest {
        disposal_container_id: disposal_container_id.to_string(),
        undocking_date,
        items: Vec::new(),
        total_mass: 0.0,
        total_volume: 0.0,
    };
    for item in candidates {
        if manifest.total_mass + item.mass > max_mass {
            break;
        }
        let volume = item.volume();
        manifest.total_mass += item.mass;
        manifest.total_volume += volume;
        manifest.items.push(ManifestItem {
            item_id: item.id.clone(),
            name: item.name.clone(),
            reason: item
                .effective_waste_reason(state.current_date)
                .unwrap_or(WasteReason::ManuallyMarked),
            mass: item.mass,
            volume,
        });
    }
    Ok(manifest)
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStep {
    pub step: usize,
    pub item_id: String,
    pub item_name: String,
    pub from_container: Option<String>,
    pub to_container: String,
}

/// Disposal manifest plus the work needed to stage it.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlan {
    pub manifest: DisposalManifest,
    pub return_steps: Vec<ReturnStep>,
    /// Retrieval sequences for every stowed manifest item, renumbered into
    /// one continuous sequence
    pub retrieval_steps: Vec<RetrievalStep>,
}

/// Plans which waste goes to the disposal container and how to get it there.
/// Items already inside the disposal container need no steps.
pub fn plan_return(
    state: &SimulationState,
    disposal_container_id: &str,
    undocking_date: Option<Date>,
    max_mass: f64,
) -> Result<ReturnPlan, SimulationError> {
    let manifest = plan_disposal(state, disposal_container_id, undocking_date, max_mass)?;

    let mut return_steps = Vec::new();
    let mut retrieval_steps = Vec::new();
    for entry in &manifest.items {
        let Some(item) = state.item(&entry.item_id) else {
            continue;
        };
        if item.is_in_container(disposal_container_id) {
            continue;
        }
        for mut step in plan_retrieval(item, &state.items).steps {
            step.step = retrieval_steps.len() + 1;
            retrieval_steps.push(step);
        }
        return_steps.push(ReturnStep {
            step: return_steps.len() + 1,
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            from_container: item.container_id().map(str::to_string),
            to_container: disposal_container_id.to_string(),
        });
    }

    Ok(ReturnPlan {
        manifest,
        return_steps,
        retrieval_steps,
    })
}

/// Moves manifest items into the disposal container.
pub fn stage_disposal(
    state: &mut SimulationState,
    manifest: &DisposalManifest,
    actor: &Actor,
) -> Result<Vec<MoveRecord>, SimulationError> {
    let target = manifest.disposal_container_id.as_str();
    state.require_container(target)?;
    let mut indices = Vec::with_capacity(manifest.items.len());
    for entry in &manifest.items {
        indices.push(state.item_index(&entry.item_id)?);
    }

    let mut moves = Vec::new();
    for index in indices {
        if state.items[index].is_in_container(target) {
            continue;
        }
        moves.push(state.relocate(index, target, actor, "disposal staging")?);
    }
    info!(
        target: "stowage.waste",
        container = target,
        staged = moves.len(),
        "disposal staged"
    );
    Ok(moves)
}

/// Removes every item inside the container from the station. The container
/// itself stays, empty.
pub fn complete_undocking(
    state: &mut SimulationState,
    container_id: &str,
    actor: &Actor,
) -> Result<usize, SimulationError> {
    state.require_container(container_id)?;
    let before = state.items.len();
    state.items.retain(|item| !item.is_in_container(container_id));
    let removed = before - state.items.len();

    state.refresh_container(container_id);
    state.logs.record(
        actor,
        ActionKind::Undocking,
        format!("Undocked container {container_id} with {removed} items"),
        None,
        Some(container_id),
    );
    info!(target: "stowage.waste", container = container_id, removed, "undocking complete");
    Ok(removed)
}
