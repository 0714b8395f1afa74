//! The simulation aggregate root.
//!
//! `SimulationState` owns the simulated date, containers, items, action log
//! and crew roster. Every state-changing operation takes `&mut SimulationState`
//! and either applies completely or returns an error before touching anything,
//! so a single writer holding the state (see `api`) gets one transaction per
//! call. Only the waste and time engine moves `current_date`.

use jiff::civil::Date;
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::action_log::{ActionKind, ActionLog, Actor};
use crate::geometry::fits_inside;
use crate::model::{Astronaut, Container, Item, ValidationError};
use crate::placement::{PlacementRecord, PlannerConfig, compute_position};
use crate::space;
use crate::types::Dimensional;

/// Failures of engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Item already exists: {0}")]
    DuplicateItem(String),
    #[error("Item {item_id} does not fit inside container {container_id} at the requested position")]
    OutOfBounds {
        item_id: String,
        container_id: String,
    },
    #[error("Target date {target} is before the current date {current}")]
    TargetDateInPast { target: Date, current: Date },
    #[error("Date out of range: {0}")]
    DateOutOfRange(#[from] jiff::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimulationError {
    /// Whether the error is caused by an unknown identifier.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SimulationError::ItemNotFound(_) | SimulationError::ContainerNotFound(_)
        )
    }
}

/// A relocation performed by a rearrangement or disposal staging.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub from_container: Option<String>,
    pub placement: PlacementRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    #[schema(value_type = String, example = "2025-05-30")]
    pub current_date: Date,
    pub containers: Vec<Container>,
    pub items: Vec<Item>,
    #[schema(value_type = Vec<crate::action_log::LogEntry>)]
    pub logs: ActionLog,
    pub astronauts: Vec<Astronaut>,
    #[serde(skip)]
    pub config: PlannerConfig,
}

impl SimulationState {
    /// Creates an empty station at `current_date`.
    pub fn new(current_date: Date, config: PlannerConfig) -> Self {
        Self {
            current_date,
            containers: Vec::new(),
            items: Vec::new(),
            logs: ActionLog::new(),
            astronauts: Vec::new(),
            config,
        }
    }

    pub fn with_astronauts(mut self, astronauts: Vec<Astronaut>) -> Self {
        self.astronauts = astronauts;
        self
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn container(&self, container_id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == container_id)
    }

    pub(crate) fn item_index(&self, item_id: &str) -> Result<usize, SimulationError> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| SimulationError::ItemNotFound(item_id.to_string()))
    }

    pub(crate) fn require_container(&self, container_id: &str) -> Result<&Container, SimulationError> {
        self.container(container_id)
            .ok_or_else(|| SimulationError::ContainerNotFound(container_id.to_string()))
    }

    /// Recomputes utilization of one container from the item collection.
    pub fn refresh_container(&mut self, container_id: &str) {
        space::refresh_by_id(&mut self.containers, &self.items, container_id);
    }

    pub fn refresh_all(&mut self) {
        space::refresh_all(&mut self.containers, &self.items);
    }

    /// Inserts or replaces containers by id, then refreshes utilization.
    ///
    /// Items that no longer fit a resized container are taken out; their ids
    /// are returned.
    pub(crate) fn upsert_containers(&mut self, incoming: Vec<Container>, actor: &Actor) -> Vec<String> {
        for mut container in incoming {
            container.space_utilization = 0;
            container.item_ids.clear();
            match self.containers.iter_mut().find(|c| c.id == container.id) {
                Some(existing) => *existing = container,
                None => self.containers.push(container),
            }
        }
        let unstowed = self.unstow_misfits(actor);
        self.refresh_all();
        unstowed
    }

    /// Takes every stowed item whose box pokes out of its container back into
    /// hand and logs it. Does not refresh utilization.
    pub(crate) fn unstow_misfits(&mut self, actor: &Actor) -> Vec<String> {
        let misfits: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.position.as_ref().is_some_and(|position| {
                    self.container(&position.container_id)
                        .is_some_and(|c| !fits_inside(c, position.origin(), item.dimensions()))
                })
            })
            .map(|(index, _)| index)
            .collect();

        let mut unstowed = Vec::with_capacity(misfits.len());
        for index in misfits {
            let item = &mut self.items[index];
            let Some(position) = item.position.take() else {
                continue;
            };
            warn!(
                target: "stowage.simulation",
                item = %item.id,
                container = %position.container_id,
                "item no longer fits and was unstowed"
            );
            let description = format!(
                "Took {} out of {}: no longer fits",
                item.name, position.container_id
            );
            let item_id = item.id.clone();
            self.logs.record(
                actor,
                ActionKind::Rearrangement,
                description,
                Some(&item_id),
                Some(&position.container_id),
            );
            unstowed.push(item_id);
        }
        unstowed
    }

    /// Moves the item at `item_index` into `container_id` using the stacking
    /// rule and logs the move as a rearrangement.
    ///
    /// Callers check that the container exists.
    pub(crate) fn relocate(
        &mut self,
        item_index: usize,
        container_id: &str,
        actor: &Actor,
        purpose: &str,
    ) -> Result<MoveRecord, SimulationError> {
        let container = self.require_container(container_id)?;
        let origin = compute_position(&self.items[item_index], container, &self.items, &self.config);

        let item = &mut self.items[item_index];
        let from_container = item.position.as_ref().map(|p| p.container_id.clone());
        item.position = Some(crate::model::Position::new(container_id, origin));
        let description = format!(
            "Moved {} from {} to {} ({})",
            item.name,
            from_container.as_deref().unwrap_or("hand"),
            container_id,
            purpose
        );
        let item_id = item.id.clone();
        debug!(
            target: "stowage.simulation",
            item = %item_id,
            to = container_id,
            "item relocated"
        );

        if let Some(from) = from_container.as_deref() {
            self.refresh_container(from);
        }
        self.refresh_container(container_id);
        self.logs.record(
            actor,
            ActionKind::Rearrangement,
            description,
            Some(&item_id),
            Some(container_id),
        );

        let placement = PlacementRecord::for_item(&self.items[item_index])
            .ok_or_else(|| SimulationError::ItemNotFound(item_id.clone()))?;
        Ok(MoveRecord {
            from_container,
            placement,
        })
    }
}
