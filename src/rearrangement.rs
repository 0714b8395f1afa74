//! Rearrangement planning.
//!
//! Moves low-priority items out of the fullest overloaded container into the
//! emptiest underloaded one. Only that single pair is planned per call, with
//! at most `max_moves` items moved between them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::action_log::Actor;
use crate::model::{Container, Item};
use crate::placement::PlannerConfig;
use crate::simulation::{MoveRecord, SimulationError, SimulationState};

/// A single suggested move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RearrangementStep {
    pub item_id: String,
    pub item_name: String,
    pub from_container: String,
    pub to_container: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RearrangementPlan {
    pub steps: Vec<RearrangementStep>,
    /// Rough estimate of space freed, `steps × space_per_move`
    pub space_gained_estimate: f64,
    pub time_estimate_minutes: u32,
}

impl RearrangementPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Suggests moves from the fullest overloaded container to the emptiest
/// underloaded one, least critical items first.
///
/// Utilization values are taken as recorded on the containers. The plan is
/// advisory; nothing changes until [`execute_rearrangement`] applies it.
pub fn plan_rearrangement(
    containers: &[Container],
    items: &[Item],
    config: &PlannerConfig,
) -> RearrangementPlan {
    let source = containers
        .iter()
        .filter(|c| c.space_utilization > config.overload_threshold)
        .min_by(|a, b| {
            b.space_utilization
                .cmp(&a.space_utilization)
                .then_with(|| a.id.cmp(&b.id))
        });
    let target = containers
        .iter()
        .filter(|c| c.space_utilization < config.underload_threshold)
        .min_by(|a, b| {
            a.space_utilization
                .cmp(&b.space_utilization)
                .then_with(|| a.id.cmp(&b.id))
        });

    let mut steps = Vec::new();
    if let (Some(source), Some(target)) = (source, target) {
        let mut movable: Vec<&Item> = items
            .iter()
            .filter(|item| item.is_in_container(&source.id))
            .collect();
        movable.sort_by(|a, b| by_priority_then_id(a, b));

        let reason = format!(
            "Redistribute from high-utilization container ({}%) to low-utilization container ({}%)",
            source.space_utilization, target.space_utilization
        );
        steps.extend(movable.into_iter().take(config.max_moves).map(|item| RearrangementStep {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            from_container: source.id.clone(),
            to_container: target.id.clone(),
            reason: reason.clone(),
        }));
    }

    let count = steps.len();
    RearrangementPlan {
        steps,
        space_gained_estimate: count as f64 * config.space_per_move,
        time_estimate_minutes: u32::try_from(count)
            .unwrap_or(u32::MAX)
            .saturating_mul(config.minutes_per_move),
    }
}

fn by_priority_then_id(a: &Item, b: &Item) -> Ordering {
    a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id))
}

/// Applies a plan step by step.
///
/// Every referenced item and destination is checked before anything moves.
/// Steps whose item has already left the source container are skipped.
pub fn execute_rearrangement(
    state: &mut SimulationState,
    plan: &RearrangementPlan,
    actor: &Actor,
) -> Result<Vec<MoveRecord>, SimulationError> {
    if plan.is_empty() {
        return Ok(Vec::new());
    }
    for step in &plan.steps {
        state.item_index(&step.item_id)?;
        state.require_container(&step.to_container)?;
    }

    let mut moves = Vec::new();
    for step in &plan.steps {
        let index = state.item_index(&step.item_id)?;
        if !state.items[index].is_in_container(&step.from_container) {
            continue;
        }
        moves.push(state.relocate(index, &step.to_container, actor, "rearrangement")?);
    }

    info!(
        target: "stowage.rearrangement",
        planned = plan.steps.len(),
        moved = moves.len(),
        "rearrangement executed"
    );
    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::ActionKind;
    use crate::model::{Position, Zone};
    use crate::types::Vec3;
    use jiff::civil::date;

    fn container(id: &str, utilization: u8) -> Container {
        let mut c = Container::new(id, Zone::StorageBay, Vec3::new(100.0, 100.0, 100.0)).unwrap();
        c.space_utilization = utilization;
        c
    }

    fn stowed(id: &str, priority: u8, container: &str) -> Item {
        Item::new(id, id.to_uppercase(), Vec3::new(10.0, 10.0, 10.0), 1.0, priority, Zone::StorageBay)
            .unwrap()
            .with_position(Position::new(container, Vec3::zero()))
    }

    #[test]
    fn moves_lowest_priority_items_from_full_to_empty() {
        let containers = vec![container("A", 85), container("B", 10)];
        let items = vec![
            stowed("i1", 90, "A"),
            stowed("i2", 10, "A"),
            stowed("i3", 30, "A"),
            stowed("i4", 50, "A"),
            stowed("i5", 70, "A"),
        ];

        let plan = plan_rearrangement(&containers, &items, &PlannerConfig::default());
        let moved: Vec<&str> = plan.steps.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(moved, vec!["i2", "i3", "i4"]);
        assert!(plan.steps.iter().all(|s| s.from_container == "A" && s.to_container == "B"));
        assert_eq!(
            plan.steps[0].reason,
            "Redistribute from high-utilization container (85%) to low-utilization container (10%)"
        );
        assert_eq!(plan.space_gained_estimate, 30.0);
        assert_eq!(plan.time_estimate_minutes, 15);
    }

    #[test]
    fn balanced_containers_need_no_moves() {
        let containers = vec![container("A", 70), container("B", 40)];
        let items = vec![stowed("i1", 1, "A")];
        let plan = plan_rearrangement(&containers, &items, &PlannerConfig::default());
        assert!(plan.is_empty());
        assert_eq!(plan.space_gained_estimate, 0.0);
        assert_eq!(plan.time_estimate_minutes, 0);
    }

    #[test]
    fn only_the_extreme_pair_is_rebalanced() {
        let containers = vec![
            container("hot1", 95),
            container("hot2", 75),
            container("mid", 55),
            container("cold1", 5),
            container("cold2", 30),
        ];
        let items = vec![
            stowed("a", 1, "hot1"),
            stowed("b", 2, "hot2"),
            stowed("c", 3, "mid"),
        ];
        let plan = plan_rearrangement(&containers, &items, &PlannerConfig::default());
        for step in &plan.steps {
            let from = containers.iter().find(|c| c.id == step.from_container).unwrap();
            let to = containers.iter().find(|c| c.id == step.to_container).unwrap();
            assert!(from.space_utilization > 70);
            assert!(to.space_utilization < 40);
        }
        let pairs: Vec<(&str, &str)> = plan
            .steps
            .iter()
            .map(|s| (s.from_container.as_str(), s.to_container.as_str()))
            .collect();
        assert_eq!(pairs, vec![("hot1", "cold1")]);
    }

    #[test]
    fn execution_moves_each_item_once_and_logs() {
        let mut state = SimulationState::new(date(2025, 5, 30), PlannerConfig::default());
        state.containers = vec![
            Container::new("A", Zone::StorageBay, Vec3::new(10.0, 10.0, 20.0)).unwrap(),
            Container::new("B", Zone::StorageBay, Vec3::new(100.0, 100.0, 100.0)).unwrap(),
            Container::new("C", Zone::StorageBay, Vec3::new(100.0, 100.0, 100.0)).unwrap(),
        ];
        let mut upper = stowed("i2", 80, "A");
        upper.position = Some(Position::new("A", Vec3::new(0.0, 0.0, 10.0)));
        state.items = vec![stowed("i1", 10, "A"), upper];
        state.refresh_all();
        assert_eq!(state.container("A").unwrap().space_utilization, 100);

        let plan = plan_rearrangement(&state.containers, &state.items, &state.config);
        assert_eq!(plan.steps.len(), 2);

        // Replaying a step whose item already moved is a no-op.
        let mut replayed = plan.clone();
        replayed.steps.push(plan.steps[0].clone());
        let plan = replayed;

        let moves = execute_rearrangement(&mut state, &plan, &Actor::new("ast1")).unwrap();
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|m| m.placement.container_id == "B"));
        assert_eq!(state.container("A").unwrap().space_utilization, 0);
        assert_eq!(state.container("B").unwrap().item_ids.len(), 2);
        assert_eq!(
            state.item("i2").unwrap().position,
            Some(Position::new("B", Vec3::new(0.0, 0.0, 10.0)))
        );
        assert!(state
            .logs
            .entries()
            .iter()
            .all(|e| e.action == ActionKind::Rearrangement));
    }

    #[test]
    fn execution_rejects_unknown_references_untouched() {
        let mut state = SimulationState::new(date(2025, 5, 30), PlannerConfig::default());
        state.containers = vec![container("A", 90)];
        state.items = vec![stowed("i1", 1, "A")];
        let before = state.clone();

        let plan = RearrangementPlan {
            steps: vec![RearrangementStep {
                item_id: "i1".into(),
                item_name: "I1".into(),
                from_container: "A".into(),
                to_container: "missing".into(),
                reason: String::new(),
            }],
            ..RearrangementPlan::default()
        };
        let err = execute_rearrangement(&mut state, &plan, &Actor::system()).unwrap_err();
        assert!(matches!(err, SimulationError::ContainerNotFound(id) if id == "missing"));
        assert_eq!(state, before);
    }
}
