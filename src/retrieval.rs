//! Retrieval planning.
//!
//! Items are taken out through the top of a container, so everything sitting
//! above a target's footprint has to come out first and goes back in reverse
//! order afterwards.

use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::action_log::{ActionKind, Actor};
use crate::geometry::blocks;
use crate::model::{Item, WasteReason};
use crate::simulation::{SimulationError, SimulationState};

/// What happens in a single retrieval step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum StepAction {
    Remove,
    Retrieve,
    PlaceBack,
}

/// One numbered step of a retrieval sequence.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalStep {
    /// 1-based, increasing across the whole sequence
    pub step: usize,
    pub action: StepAction,
    pub item_id: String,
    pub item_name: String,
}

/// Ordered steps plus the blocking items that have to be handled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetrievalPlan {
    pub steps: Vec<RetrievalStep>,
    pub items_to_move: Vec<Item>,
}

impl RetrievalPlan {
    pub fn blocker_count(&self) -> usize {
        self.items_to_move.len()
    }
}

/// Plans how to take `target` out of its container.
///
/// Blockers are reported in the iteration order of `items`. An unstowed
/// target yields an empty plan; items in other containers are never touched.
pub fn plan_retrieval(target: &Item, items: &[Item]) -> RetrievalPlan {
    if target.position.is_none() {
        return RetrievalPlan::default();
    }

    let blockers: Vec<&Item> = items.iter().filter(|item| blocks(item, target)).collect();

    let mut steps = Vec::with_capacity(blockers.len() * 2 + 1);
    let mut push = |action: StepAction, item: &Item| {
        let step = steps.len() + 1;
        steps.push(RetrievalStep {
            step,
            action,
            item_id: item.id.clone(),
            item_name: item.name.clone(),
        });
    };

    for blocker in &blockers {
        push(StepAction::Remove, blocker);
    }
    push(StepAction::Retrieve, target);
    for blocker in blockers.iter().rev() {
        push(StepAction::PlaceBack, blocker);
    }

    RetrievalPlan {
        steps,
        items_to_move: blockers.into_iter().cloned().collect(),
    }
}

/// What a committed retrieval did.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalOutcome {
    pub item_id: String,
    pub from_container: Option<String>,
    pub usage_count: u32,
    pub remaining_uses: Option<u32>,
    /// Set when this retrieval used up the item
    pub became_waste: bool,
    pub steps: Vec<RetrievalStep>,
}

/// Takes an item out of its container and counts one use.
///
/// Blockers are put back where they were, so only the target's position
/// changes. Items already flagged as waste are taken out without counting a
/// use. An item whose usage limit is reached here becomes waste ("Out of
/// Uses") in the same operation.
pub fn retrieve_item(
    state: &mut SimulationState,
    item_id: &str,
    actor: &Actor,
) -> Result<RetrievalOutcome, SimulationError> {
    let index = state.item_index(item_id)?;
    let plan = plan_retrieval(&state.items[index], &state.items);
    let blockers = plan.blocker_count();

    let item = &mut state.items[index];
    let from_container = item.position.take().map(|p| p.container_id);
    let mut became_waste = false;
    if !item.is_waste {
        item.record_use();
        if item.is_depleted() {
            became_waste = item.mark_waste(WasteReason::OutOfUses);
        }
    }
    let name = item.name.clone();
    let outcome = RetrievalOutcome {
        item_id: item.id.clone(),
        from_container: from_container.clone(),
        usage_count: item.usage_count,
        remaining_uses: item.remaining_uses(),
        became_waste,
        steps: plan.steps,
    };

    if let Some(container_id) = from_container.as_deref() {
        state.refresh_container(container_id);
    }
    state.logs.record(
        actor,
        ActionKind::Retrieval,
        format!(
            "Retrieved {} from {}",
            name,
            from_container.as_deref().unwrap_or("hand")
        ),
        Some(item_id),
        from_container.as_deref(),
    );
    if became_waste {
        state.logs.record(
            actor,
            ActionKind::WasteMarking,
            format!("Marked {} as waste: {}", name, WasteReason::OutOfUses),
            Some(item_id),
            None,
        );
    }

    info!(
        target: "stowage.retrieval",
        item = item_id,
        blockers,
        became_waste,
        "item retrieved"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Container, Position, Zone};
    use crate::placement::PlannerConfig;
    use crate::types::Vec3;
    use jiff::civil::date;

    fn stowed(id: &str, container: &str, origin: Vec3) -> Item {
        Item::new(id, format!("Item {id}"), Vec3::new(10.0, 10.0, 10.0), 1.0, 50, Zone::Airlock)
            .unwrap()
            .with_position(Position::new(container, origin))
    }

    #[test]
    fn unstowed_target_has_no_steps() {
        let loose = Item::new("t", "T", Vec3::new(1.0, 1.0, 1.0), 1.0, 1, Zone::Airlock).unwrap();
        let plan = plan_retrieval(&loose, &[stowed("a", "c1", Vec3::zero())]);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.blocker_count(), 0);
    }

    #[test]
    fn unblocked_target_is_a_single_retrieve() {
        let target = stowed("t", "c1", Vec3::zero());
        let items = vec![target.clone(), stowed("side", "c1", Vec3::new(10.0, 0.0, 0.0))];
        let plan = plan_retrieval(&target, &items);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, StepAction::Retrieve);
        assert_eq!(plan.steps[0].step, 1);
    }

    #[test]
    fn step_count_is_two_k_plus_one_with_mirrored_place_back() {
        let target = stowed("t", "c1", Vec3::zero());
        let items = vec![
            stowed("b1", "c1", Vec3::new(0.0, 0.0, 10.0)),
            target.clone(),
            stowed("other", "c2", Vec3::new(0.0, 0.0, 10.0)),
            stowed("b2", "c1", Vec3::new(5.0, 5.0, 20.0)),
            stowed("b3", "c1", Vec3::new(2.0, 2.0, 30.0)),
            stowed("beside", "c1", Vec3::new(10.0, 10.0, 10.0)),
        ];

        let plan = plan_retrieval(&target, &items);
        let k = plan.blocker_count();
        assert_eq!(k, 3);
        assert_eq!(plan.steps.len(), 2 * k + 1);

        for (idx, step) in plan.steps.iter().enumerate() {
            assert_eq!(step.step, idx + 1);
        }
        assert!(plan.steps[..k].iter().all(|s| s.action == StepAction::Remove));
        assert_eq!(plan.steps[k].action, StepAction::Retrieve);
        assert_eq!(plan.steps[k].item_id, "t");

        let removed: Vec<&str> = plan.steps[..k].iter().map(|s| s.item_id.as_str()).collect();
        let mut placed_back: Vec<&str> =
            plan.steps[k + 1..].iter().map(|s| s.item_id.as_str()).collect();
        assert!(plan.steps[k + 1..].iter().all(|s| s.action == StepAction::PlaceBack));
        placed_back.reverse();
        assert_eq!(removed, placed_back);
        assert_eq!(removed, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn items_below_target_do_not_block() {
        let target = stowed("t", "c1", Vec3::new(0.0, 0.0, 10.0));
        let items = vec![stowed("under", "c1", Vec3::zero()), target.clone()];
        let plan = plan_retrieval(&target, &items);
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn step_serializes_camel_case_action() {
        let step = RetrievalStep {
            step: 1,
            action: StepAction::PlaceBack,
            item_id: "a".into(),
            item_name: "A".into(),
        };
        let value = serde_json::to_value(step).unwrap();
        assert_eq!(value["action"], "placeBack");
        assert_eq!(value["itemId"], "a");
    }

    fn station_with(items: Vec<Item>) -> SimulationState {
        let mut state = SimulationState::new(date(2025, 5, 30), PlannerConfig::default());
        state.containers =
            vec![Container::new("c1", Zone::Airlock, Vec3::new(20.0, 20.0, 40.0)).unwrap()];
        state.items = items;
        state.refresh_all();
        state
    }

    #[test]
    fn retrieval_counts_a_use_and_leaves_blockers_in_place() {
        let mut state = station_with(vec![
            stowed("t", "c1", Vec3::zero()).with_usage(Some(10), 2),
            stowed("b1", "c1", Vec3::new(0.0, 0.0, 10.0)),
        ]);
        let outcome = retrieve_item(&mut state, "t", &Actor::new("ast1")).unwrap();

        assert_eq!(outcome.usage_count, 3);
        assert_eq!(outcome.remaining_uses, Some(7));
        assert_eq!(outcome.steps.len(), 3);
        assert!(!outcome.became_waste);
        assert!(state.item("t").unwrap().position.is_none());
        assert_eq!(
            state.item("b1").unwrap().position,
            Some(Position::new("c1", Vec3::new(0.0, 0.0, 10.0)))
        );
        assert_eq!(state.container("c1").unwrap().item_ids, vec!["b1".to_string()]);
        assert_eq!(state.logs.len(), 1);
        assert_eq!(state.logs.entries()[0].action, ActionKind::Retrieval);
    }

    #[test]
    fn last_use_marks_item_out_of_uses() {
        let mut state = station_with(vec![stowed("t", "c1", Vec3::zero()).with_usage(Some(5), 4)]);
        let outcome = retrieve_item(&mut state, "t", &Actor::new("ast1")).unwrap();

        assert!(outcome.became_waste);
        let item = state.item("t").unwrap();
        assert_eq!(item.usage_count, 5);
        assert!(item.is_waste);
        assert_eq!(item.waste_reason, Some(WasteReason::OutOfUses));
        let kinds: Vec<ActionKind> = state.logs.entries().iter().map(|e| e.action).collect();
        assert_eq!(kinds, vec![ActionKind::Retrieval, ActionKind::WasteMarking]);
    }

    #[test]
    fn waste_items_are_taken_out_without_counting() {
        let mut waste = stowed("t", "c1", Vec3::zero()).with_usage(Some(5), 5);
        waste.mark_waste(WasteReason::OutOfUses);
        let mut state = station_with(vec![waste]);
        let outcome = retrieve_item(&mut state, "t", &Actor::system()).unwrap();
        assert_eq!(outcome.usage_count, 5);
        assert!(!outcome.became_waste);
    }

    #[test]
    fn unknown_item_changes_nothing() {
        let mut state = station_with(vec![stowed("t", "c1", Vec3::zero())]);
        let before = state.clone();
        let err = retrieve_item(&mut state, "nope", &Actor::system()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(state, before);
    }
}
