//! Placement engine: chooses a container and an origin for an unstowed item.
//!
//! Container choice is greedy:
//! - Only containers at least as large as the item on every axis, whose free
//!   volume admits it, are eligible
//! - Containers in the item's preferred zone rank first
//! - Within a tier the least utilized container wins, then the lowest id
//!
//! The free-volume check is a capacity heuristic, not a geometric fit test, so
//! a fragmented container can be chosen even though no gap is large enough.
//! Positioning stacks on the current top item, shifted back inside the walls
//! where the item overhangs, and falls back to a spot beside it when the stack
//! would exceed the container height. The fallback is best-effort and may
//! overlap existing items.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::action_log::{ActionKind, Actor};
use crate::geometry::fits_inside;
use crate::model::{Container, Item, Position};
use crate::simulation::{SimulationError, SimulationState};
use crate::space::free_volume;
use crate::types::{Dimensional, EPSILON_GENERAL, Vec3};

/// Tunables shared by the placement and rearrangement planners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Offset along X used when a stack would exceed the container height
    pub stack_spacing: f64,
    /// Containers above this utilization (%) are rearrangement sources
    pub overload_threshold: u8,
    /// Containers below this utilization (%) are rearrangement targets
    pub underload_threshold: u8,
    /// Maximum number of moves in one rearrangement plan
    pub max_moves: usize,
    /// Estimated space gained per rearrangement step
    pub space_per_move: f64,
    /// Estimated minutes per rearrangement step
    pub minutes_per_move: u32,
}

impl PlannerConfig {
    pub const DEFAULT_STACK_SPACING: f64 = 20.0;
    pub const DEFAULT_OVERLOAD_THRESHOLD: u8 = 70;
    pub const DEFAULT_UNDERLOAD_THRESHOLD: u8 = 40;
    pub const DEFAULT_MAX_MOVES: usize = 3;
    pub const DEFAULT_SPACE_PER_MOVE: f64 = 10.0;
    pub const DEFAULT_MINUTES_PER_MOVE: u32 = 5;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::default()
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            stack_spacing: Self::DEFAULT_STACK_SPACING,
            overload_threshold: Self::DEFAULT_OVERLOAD_THRESHOLD,
            underload_threshold: Self::DEFAULT_UNDERLOAD_THRESHOLD,
            max_moves: Self::DEFAULT_MAX_MOVES,
            space_per_move: Self::DEFAULT_SPACE_PER_MOVE,
            minutes_per_move: Self::DEFAULT_MINUTES_PER_MOVE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    /// Sets the side-fallback spacing.
    pub fn stack_spacing(mut self, spacing: f64) -> Self {
        self.config.stack_spacing = spacing;
        self
    }

    /// Sets the overload threshold in percent.
    pub fn overload_threshold(mut self, percent: u8) -> Self {
        self.config.overload_threshold = percent;
        self
    }

    /// Sets the underload threshold in percent.
    pub fn underload_threshold(mut self, percent: u8) -> Self {
        self.config.underload_threshold = percent;
        self
    }

    pub fn max_moves(mut self, moves: usize) -> Self {
        self.config.max_moves = moves;
        self
    }

    pub fn space_per_move(mut self, space: f64) -> Self {
        self.config.space_per_move = space;
        self
    }

    pub fn minutes_per_move(mut self, minutes: u32) -> Self {
        self.config.minutes_per_move = minutes;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

/// Recommended container and origin for an item.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub container_id: String,
    pub origin: Vec3,
}

impl Placement {
    pub fn to_position(&self) -> Position {
        Position::new(self.container_id.clone(), self.origin)
    }
}

/// Finds a container and position for `item`.
///
/// # Parameters
/// * `item` - The item to stow; its current position is ignored
/// * `containers` - Candidate containers with up-to-date utilization
/// * `all_items` - Every item on the station, used to find the current stack top
/// * `config` - Planner tunables
///
/// # Returns
/// `None` when no container is large enough or has enough free volume
/// (rearrangement needed)
pub fn find_placement(
    item: &Item,
    containers: &[Container],
    all_items: &[Item],
    config: &PlannerConfig,
) -> Option<Placement> {
    let item_volume = item.volume();

    let mut eligible: Vec<&Container> = containers
        .iter()
        .filter(|container| {
            item.dimensions()
                .fits_within(&container.dimensions(), EPSILON_GENERAL)
                && free_volume(container) + EPSILON_GENERAL >= item_volume
        })
        .collect();
    eligible.sort_by(|a, b| rank_containers(item, a, b));

    let Some(target) = eligible.first() else {
        debug!(
            target: "stowage.placement",
            item = %item.id,
            volume = item_volume,
            "no container admits item"
        );
        return None;
    };

    let origin = compute_position(item, target, all_items, config);
    debug!(
        target: "stowage.placement",
        item = %item.id,
        container = %target.id,
        x = origin.x,
        y = origin.y,
        z = origin.z,
        "placement found"
    );
    Some(Placement {
        container_id: target.id.clone(),
        origin,
    })
}

fn rank_containers(item: &Item, a: &Container, b: &Container) -> Ordering {
    let a_rank = u8::from(a.zone != item.preferred_zone);
    let b_rank = u8::from(b.zone != item.preferred_zone);
    a_rank
        .cmp(&b_rank)
        .then_with(|| a.space_utilization.cmp(&b.space_utilization))
        .then_with(|| a.id.cmp(&b.id))
}

/// Computes the origin for `item` inside `container`.
///
/// Empty containers get the origin. Otherwise the item is stacked on the
/// item with the highest top, pulled in from the side walls if it would
/// overhang them; if the stack would poke through the lid it goes beside that
/// item at floor level instead.
pub fn compute_position(
    item: &Item,
    container: &Container,
    all_items: &[Item],
    config: &PlannerConfig,
) -> Vec3 {
    let mut current_top: Option<(f64, Vec3)> = None;
    for other in all_items
        .iter()
        .filter(|other| other.id != item.id && other.is_in_container(&container.id))
    {
        let Some(bbox) = other.bounding_box() else {
            continue;
        };
        let is_higher = match current_top {
            Some((top_z, _)) => bbox.top_z() > top_z,
            None => true,
        };
        if is_higher {
            current_top = Some((bbox.top_z(), bbox.min));
        }
    }

    match current_top {
        None => Vec3::zero(),
        Some((top_z, base)) if top_z + item.height <= container.height + EPSILON_GENERAL => Vec3::new(
            base.x.min(container.width - item.width).max(0.0),
            base.y.min(container.depth - item.depth).max(0.0),
            top_z,
        ),
        Some((_, base)) => Vec3::new(base.x + config.stack_spacing, base.y, 0.0),
    }
}

/// Corner coordinates in container space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl From<Coordinates> for Vec3 {
    fn from(c: Coordinates) -> Self {
        Vec3::new(c.width, c.depth, c.height)
    }
}

impl From<Vec3> for Coordinates {
    fn from(v: Vec3) -> Self {
        Self {
            width: v.x,
            depth: v.y,
            height: v.z,
        }
    }
}

/// Where a stowed item sits, as reported to callers.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecord {
    pub item_id: String,
    pub container_id: String,
    pub start_coordinates: Coordinates,
    pub end_coordinates: Coordinates,
}

impl PlacementRecord {
    /// `None` while the item is in hand.
    pub fn for_item(item: &Item) -> Option<Self> {
        let position = item.position.as_ref()?;
        let bbox = item.bounding_box()?;
        Some(Self {
            item_id: item.id.clone(),
            container_id: position.container_id.clone(),
            start_coordinates: bbox.min.into(),
            end_coordinates: bbox.max.into(),
        })
    }
}

/// Result of placing one incoming item.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PlacementOutcome {
    Placed(PlacementRecord),
    /// No container was large enough or had enough free volume; the item was
    /// not added
    #[serde(rename_all = "camelCase")]
    RearrangementNeeded { item_id: String },
    /// The item was invalid or its id is already taken
    #[serde(rename_all = "camelCase")]
    Rejected { item_id: String, reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct PlacementReport {
    pub outcomes: Vec<PlacementOutcome>,
    /// Items taken out because a replaced container no longer holds them
    pub unstowed: Vec<String>,
}

impl PlacementReport {
    pub fn placements(&self) -> impl Iterator<Item = &PlacementRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PlacementOutcome::Placed(record) => Some(record),
            _ => None,
        })
    }

    pub fn rearrangement_needed(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PlacementOutcome::RearrangementNeeded { item_id } => Some(item_id.as_str()),
            _ => None,
        })
    }
}

/// Upserts `containers`, then stows each of `items` in order.
///
/// Every container is validated before anything changes. Items are handled
/// one by one so later items see the utilization left by earlier ones.
pub fn place_items(
    state: &mut SimulationState,
    items: Vec<Item>,
    containers: Vec<Container>,
    actor: &Actor,
) -> Result<PlacementReport, SimulationError> {
    for container in &containers {
        container.validate()?;
    }
    let mut report = PlacementReport::default();
    if !containers.is_empty() {
        report.unstowed = state.upsert_containers(containers, actor);
    }

    for mut item in items {
        if let Err(err) = item.validate() {
            report.outcomes.push(PlacementOutcome::Rejected {
                item_id: item.id,
                reason: err.to_string(),
            });
            continue;
        }
        if state.item(&item.id).is_some() {
            report.outcomes.push(PlacementOutcome::Rejected {
                reason: SimulationError::DuplicateItem(item.id.clone()).to_string(),
                item_id: item.id,
            });
            continue;
        }

        item.position = None;
        let Some(placement) = find_placement(&item, &state.containers, &state.items, &state.config)
        else {
            report
                .outcomes
                .push(PlacementOutcome::RearrangementNeeded { item_id: item.id });
            continue;
        };

        item.position = Some(placement.to_position());
        let description = format!(
            "Placed {} in {} at ({}, {}, {})",
            item.name, placement.container_id, placement.origin.x, placement.origin.y, placement.origin.z
        );
        state.logs.record(
            actor,
            ActionKind::Placement,
            description,
            Some(&item.id),
            Some(&placement.container_id),
        );
        if let Some(record) = PlacementRecord::for_item(&item) {
            report.outcomes.push(PlacementOutcome::Placed(record));
        }
        state.items.push(item);
        state.refresh_container(&placement.container_id);
    }

    info!(
        target: "stowage.placement",
        placed = report.placements().count(),
        rearrangement_needed = report.rearrangement_needed().count(),
        "placement batch committed"
    );
    Ok(report)
}

/// Stows an existing item at an explicit origin, moving it out of any
/// container it is currently in.
pub fn place_item(
    state: &mut SimulationState,
    item_id: &str,
    container_id: &str,
    origin: Vec3,
    actor: &Actor,
) -> Result<PlacementRecord, SimulationError> {
    let index = state.item_index(item_id)?;
    let container = state.require_container(container_id)?;
    if !fits_inside(container, origin, state.items[index].dimensions()) {
        return Err(SimulationError::OutOfBounds {
            item_id: item_id.to_string(),
            container_id: container_id.to_string(),
        });
    }

    let item = &mut state.items[index];
    let previous = item
        .position
        .replace(Position::new(container_id, origin))
        .map(|p| p.container_id);
    let description = format!(
        "Placed {} in {} at ({}, {}, {})",
        item.name, container_id, origin.x, origin.y, origin.z
    );
    let record = PlacementRecord::for_item(item)
        .ok_or_else(|| SimulationError::ItemNotFound(item_id.to_string()))?;

    if let Some(previous) = previous.as_deref().filter(|id| *id != container_id) {
        state.refresh_container(previous);
    }
    state.refresh_container(container_id);
    state.logs.record(
        actor,
        ActionKind::Placement,
        description,
        Some(item_id),
        Some(container_id),
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Zone;
    use crate::space::refresh_all;
    use jiff::civil::date;

    fn container(id: &str, zone: Zone, dims: Vec3, utilization: u8) -> Container {
        let mut c = Container::new(id, zone, dims).unwrap();
        c.space_utilization = utilization;
        c
    }

    fn item(id: &str, dims: Vec3, zone: Zone) -> Item {
        Item::new(id, id, dims, 1.0, 50, zone).unwrap()
    }

    #[test]
    fn zone_match_outranks_utilization() {
        let containers = vec![
            container("storage", Zone::StorageBay, Vec3::new(100.0, 100.0, 100.0), 10),
            container("lab", Zone::Laboratory, Vec3::new(100.0, 100.0, 100.0), 80),
        ];
        let sample = item("sensor", Vec3::new(10.0, 10.0, 10.0), Zone::Laboratory);

        let placement = find_placement(&sample, &containers, &[], &PlannerConfig::default())
            .expect("an eligible container exists");
        assert_eq!(placement.container_id, "lab");
    }

    #[test]
    fn lower_utilization_wins_within_tier_then_id() {
        let dims = Vec3::new(50.0, 50.0, 50.0);
        let containers = vec![
            container("c3", Zone::Airlock, dims, 30),
            container("c2", Zone::Airlock, dims, 20),
            container("c1", Zone::Airlock, dims, 20),
        ];
        let sample = item("x", Vec3::new(5.0, 5.0, 5.0), Zone::Laboratory);

        let placement =
            find_placement(&sample, &containers, &[], &PlannerConfig::default()).unwrap();
        assert_eq!(placement.container_id, "c1");
    }

    #[test]
    fn returns_none_when_no_container_has_room() {
        let containers = vec![container("full", Zone::Airlock, Vec3::new(10.0, 10.0, 10.0), 95)];
        let sample = item("big", Vec3::new(5.0, 5.0, 5.0), Zone::Airlock);
        assert!(find_placement(&sample, &containers, &[], &PlannerConfig::default()).is_none());
        assert!(find_placement(&sample, &[], &[], &PlannerConfig::default()).is_none());
    }

    #[test]
    fn empty_container_places_at_origin() {
        let containers = vec![container("c1", Zone::Airlock, Vec3::new(50.0, 50.0, 50.0), 0)];
        let sample = item("x", Vec3::new(5.0, 5.0, 5.0), Zone::Airlock);
        let placement =
            find_placement(&sample, &containers, &[], &PlannerConfig::default()).unwrap();
        assert_eq!(placement.origin, Vec3::zero());
    }

    #[test]
    fn stacks_on_highest_item_within_bounds() {
        let mut containers = vec![container("c1", Zone::Airlock, Vec3::new(50.0, 50.0, 50.0), 0)];
        let existing = vec![
            item("low", Vec3::new(10.0, 10.0, 10.0), Zone::Airlock)
                .with_position(Position::new("c1", Vec3::new(20.0, 0.0, 0.0))),
            item("tall", Vec3::new(10.0, 10.0, 20.0), Zone::Airlock)
                .with_position(Position::new("c1", Vec3::new(5.0, 7.0, 0.0))),
        ];
        refresh_all(&mut containers, &existing);

        let sample = item("new", Vec3::new(10.0, 10.0, 10.0), Zone::Airlock);
        let placement =
            find_placement(&sample, &containers, &existing, &PlannerConfig::default()).unwrap();
        assert_eq!(placement.origin, Vec3::new(5.0, 7.0, 20.0));
        assert!(fits_inside(&containers[0], placement.origin, sample.dimensions()));
    }

    #[test]
    fn falls_back_beside_when_stack_exceeds_height() {
        let mut containers = vec![container("c1", Zone::Airlock, Vec3::new(100.0, 50.0, 30.0), 0)];
        let existing = vec![
            item("tall", Vec3::new(10.0, 10.0, 25.0), Zone::Airlock)
                .with_position(Position::new("c1", Vec3::new(3.0, 4.0, 0.0))),
        ];
        refresh_all(&mut containers, &existing);

        let sample = item("new", Vec3::new(10.0, 10.0, 10.0), Zone::Airlock);
        let config = PlannerConfig::builder().stack_spacing(15.0).build();
        let placement = find_placement(&sample, &containers, &existing, &config).unwrap();
        assert_eq!(placement.origin, Vec3::new(18.0, 4.0, 0.0));
    }

    #[test]
    fn ignores_the_item_itself_when_repositioning() {
        let containers = vec![container("c1", Zone::Airlock, Vec3::new(50.0, 50.0, 50.0), 0)];
        let sample = item("self", Vec3::new(10.0, 10.0, 10.0), Zone::Airlock)
            .with_position(Position::new("c1", Vec3::zero()));
        let origin = compute_position(
            &sample,
            &containers[0],
            std::slice::from_ref(&sample),
            &PlannerConfig::default(),
        );
        assert_eq!(origin, Vec3::zero());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PlannerConfig::builder()
            .overload_threshold(80)
            .underload_threshold(20)
            .max_moves(5)
            .space_per_move(12.5)
            .minutes_per_move(7)
            .build();
        assert_eq!(config.overload_threshold, 80);
        assert_eq!(config.underload_threshold, 20);
        assert_eq!(config.max_moves, 5);
        assert_eq!(config.space_per_move, 12.5);
        assert_eq!(config.minutes_per_move, 7);
        assert_eq!(config.stack_spacing, PlannerConfig::DEFAULT_STACK_SPACING);
    }

    #[test]
    fn skips_containers_narrower_than_the_item() {
        let containers = vec![
            container("cube", Zone::Airlock, Vec3::new(50.0, 50.0, 50.0), 0),
            container("long", Zone::StorageBay, Vec3::new(80.0, 20.0, 20.0), 50),
        ];
        let pole = item("pole", Vec3::new(60.0, 10.0, 10.0), Zone::Airlock);

        let placement = find_placement(&pole, &containers, &[], &PlannerConfig::default())
            .expect("the long container fits the pole");
        assert_eq!(placement.container_id, "long");
        assert!(fits_inside(&containers[1], placement.origin, pole.dimensions()));

        assert!(find_placement(&pole, &containers[..1], &[], &PlannerConfig::default()).is_none());
    }

    #[test]
    fn stacked_item_is_pulled_inside_the_walls() {
        let mut containers = vec![container("c1", Zone::Airlock, Vec3::new(50.0, 50.0, 50.0), 0)];
        let existing = vec![
            item("peg", Vec3::new(5.0, 5.0, 20.0), Zone::Airlock)
                .with_position(Position::new("c1", Vec3::new(45.0, 45.0, 0.0))),
        ];
        refresh_all(&mut containers, &existing);

        let tray = item("tray", Vec3::new(20.0, 20.0, 5.0), Zone::Airlock);
        let placement =
            find_placement(&tray, &containers, &existing, &PlannerConfig::default()).unwrap();
        assert_eq!(placement.origin, Vec3::new(30.0, 30.0, 20.0));
        assert!(fits_inside(&containers[0], placement.origin, tray.dimensions()));
    }

    fn station() -> SimulationState {
        let mut state = SimulationState::new(date(2025, 5, 30), PlannerConfig::default());
        state.containers = vec![
            container("lab", Zone::Laboratory, Vec3::new(20.0, 20.0, 20.0), 0),
            container("bay", Zone::StorageBay, Vec3::new(20.0, 20.0, 20.0), 0),
        ];
        state
    }

    #[test]
    fn place_items_commits_logs_and_refreshes() {
        let mut state = station();
        let incoming = vec![
            item("sensor", Vec3::new(10.0, 10.0, 10.0), Zone::Laboratory),
            item("crate", Vec3::new(20.0, 20.0, 20.0), Zone::Laboratory),
        ];
        let report = place_items(&mut state, incoming, Vec::new(), &Actor::new("ast1")).unwrap();

        assert_eq!(report.placements().count(), 2);
        assert_eq!(state.item("sensor").unwrap().container_id(), Some("lab"));
        assert_eq!(state.item("crate").unwrap().container_id(), Some("bay"));
        assert_eq!(state.container("lab").unwrap().space_utilization, 13);
        assert_eq!(state.container("bay").unwrap().space_utilization, 100);
        assert_eq!(state.logs.len(), 2);
        assert!(state.logs.entries().iter().all(|e| e.action == ActionKind::Placement));
    }

    #[test]
    fn place_items_reports_rearrangement_and_rejections() {
        let mut state = station();
        let mut bad = item("bad", Vec3::new(1.0, 1.0, 1.0), Zone::Airlock);
        bad.mass = 0.0;
        let incoming = vec![
            item("huge", Vec3::new(30.0, 30.0, 30.0), Zone::Airlock),
            bad,
            item("ok", Vec3::new(1.0, 1.0, 1.0), Zone::Airlock),
            item("ok", Vec3::new(1.0, 1.0, 1.0), Zone::Airlock),
        ];
        let report = place_items(&mut state, incoming, Vec::new(), &Actor::system()).unwrap();

        assert_eq!(report.rearrangement_needed().collect::<Vec<_>>(), vec!["huge"]);
        assert!(state.item("huge").is_none());
        assert!(matches!(
            &report.outcomes[1],
            PlacementOutcome::Rejected { item_id, .. } if item_id == "bad"
        ));
        assert!(matches!(&report.outcomes[3], PlacementOutcome::Rejected { .. }));
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn place_items_upserts_containers_first() {
        let mut state = SimulationState::new(date(2025, 5, 30), PlannerConfig::default());
        let containers = vec![container("new", Zone::Airlock, Vec3::new(10.0, 10.0, 10.0), 0)];
        let incoming = vec![item("a", Vec3::new(5.0, 5.0, 5.0), Zone::Airlock)];
        let report = place_items(&mut state, incoming, containers, &Actor::system()).unwrap();
        assert_eq!(report.placements().next().unwrap().container_id, "new");

        let mut broken = Container::new("x", Zone::Airlock, Vec3::new(1.0, 1.0, 1.0)).unwrap();
        broken.width = -1.0;
        let err = place_items(&mut state, Vec::new(), vec![broken], &Actor::system()).unwrap_err();
        assert!(matches!(err, SimulationError::Validation(_)));
        assert!(state.container("x").is_none());
    }

    #[test]
    fn manual_placement_checks_bounds_and_moves_between_containers() {
        let mut state = station();
        place_items(
            &mut state,
            vec![item("sensor", Vec3::new(10.0, 10.0, 10.0), Zone::Laboratory)],
            Vec::new(),
            &Actor::system(),
        )
        .unwrap();

        let err = place_item(&mut state, "sensor", "bay", Vec3::new(15.0, 0.0, 0.0), &Actor::system())
            .unwrap_err();
        assert!(matches!(err, SimulationError::OutOfBounds { .. }));
        assert_eq!(state.item("sensor").unwrap().container_id(), Some("lab"));

        let record =
            place_item(&mut state, "sensor", "bay", Vec3::new(10.0, 10.0, 0.0), &Actor::new("ast2"))
                .unwrap();
        assert_eq!(record.end_coordinates.width, 20.0);
        assert_eq!(state.container("lab").unwrap().space_utilization, 0);
        assert_eq!(state.container("bay").unwrap().space_utilization, 13);

        assert!(place_item(&mut state, "ghost", "bay", Vec3::zero(), &Actor::system())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let value = serde_json::to_value(PlacementOutcome::RearrangementNeeded {
            item_id: "x".into(),
        })
        .unwrap();
        assert_eq!(value["status"], "rearrangementNeeded");
        assert_eq!(value["itemId"], "x");
    }
}
