//! Space accounting for containers.
//!
//! Utilization is always recomputed from the full item collection; the item's
//! position is the only source of truth for where it lives.

use crate::model::{Container, Item};
use crate::types::Dimensional;

/// Percentage of `container`'s volume occupied by items positioned inside it,
/// rounded to the nearest integer and clamped to 0..=100.
pub fn recompute_utilization(container: &Container, items: &[Item]) -> u8 {
    let capacity = container.volume();
    if capacity <= 0.0 {
        return 0;
    }
    let used: f64 = items
        .iter()
        .filter(|item| item.is_in_container(&container.id))
        .map(Dimensional::volume)
        .sum();
    let percent = (used / capacity * 100.0).round();
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0) as u8
}

/// Refreshes the derived utilization and item-id view of one container.
pub fn refresh_container(container: &mut Container, items: &[Item]) {
    container.space_utilization = recompute_utilization(container, items);
    container.item_ids = items
        .iter()
        .filter(|item| item.is_in_container(&container.id))
        .map(|item| item.id.clone())
        .collect();
}

/// Refreshes the container with the given id. Unknown ids are ignored.
pub fn refresh_by_id(containers: &mut [Container], items: &[Item], container_id: &str) {
    if let Some(container) = containers.iter_mut().find(|c| c.id == container_id) {
        refresh_container(container, items);
    }
}

/// Refreshes every container.
pub fn refresh_all(containers: &mut [Container], items: &[Item]) {
    for container in containers.iter_mut() {
        refresh_container(container, items);
    }
}

/// Free volume according to the last recorded utilization.
pub fn free_volume(container: &Container) -> f64 {
    container.volume() * (1.0 - f64::from(container.space_utilization) / 100.0)
}
