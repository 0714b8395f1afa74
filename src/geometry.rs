//! Geometric helpers for stowed items.
//!
//! Footprint overlap and containment checks used by the space accounting,
//! placement and retrieval modules. Overlap is strict: boxes that only touch
//! along a face do not overlap.

use crate::model::{Container, Item};
use crate::types::{BoundingBox, Dimensional, EPSILON_GENERAL, Vec3};

/// Whether the horizontal footprints of two boxes intersect,
/// e.g. `a.x < b.x + b.width && a.x + a.width > b.x` on both axes.
#[inline]
pub fn overlaps_footprint(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.intersects_xy(b)
}

/// Checks whether a box at `origin` with `dims` stays inside `container`.
pub fn fits_inside(container: &Container, origin: Vec3, dims: Vec3) -> bool {
    origin.x >= -EPSILON_GENERAL
        && origin.y >= -EPSILON_GENERAL
        && origin.z >= -EPSILON_GENERAL
        && (origin + dims).fits_within(&container.dimensions(), EPSILON_GENERAL)
}

/// Whether `candidate` has to be moved before `target` can be taken out.
///
/// The open face of a container is at the top, so a blocker shares the
/// target's footprint and starts strictly higher.
pub fn blocks(candidate: &Item, target: &Item) -> bool {
    if candidate.id == target.id {
        return false;
    }
    let (Some(candidate_pos), Some(target_pos)) = (&candidate.position, &target.position) else {
        return false;
    };
    if candidate_pos.container_id != target_pos.container_id {
        return false;
    }
    match (candidate.bounding_box(), target.bounding_box()) {
        (Some(upper), Some(lower)) => {
            overlaps_footprint(&upper, &lower) && candidate_pos.z > target_pos.z
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Position, Zone};

    fn boxed(origin: Vec3, dims: Vec3) -> BoundingBox {
        BoundingBox::new(origin, dims)
    }

    fn stowed(id: &str, container: &str, origin: Vec3, dims: Vec3) -> Item {
        Item::new(id, id, dims, 1.0, 50, Zone::StorageBay)
            .unwrap()
            .with_position(Position::new(container, origin))
    }

    #[test]
    fn shared_face_is_not_overlap() {
        let a = boxed(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let b = boxed(Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        assert!(!overlaps_footprint(&a, &b));

        let c = boxed(Vec3::new(9.5, 0.0, 30.0), Vec3::new(10.0, 10.0, 10.0));
        assert!(overlaps_footprint(&a, &c));
    }

    #[test]
    fn fits_inside_checks_every_axis() {
        let container = Container::new("c1", Zone::Laboratory, Vec3::new(50.0, 40.0, 30.0)).unwrap();
        let dims = Vec3::new(10.0, 10.0, 10.0);
        assert!(fits_inside(&container, Vec3::new(40.0, 30.0, 20.0), dims));
        assert!(!fits_inside(&container, Vec3::new(41.0, 0.0, 0.0), dims));
        assert!(!fits_inside(&container, Vec3::new(0.0, 0.0, 21.0), dims));
        assert!(!fits_inside(&container, Vec3::new(-1.0, 0.0, 0.0), dims));
    }

    #[test]
    fn blocker_must_be_higher_and_share_footprint() {
        let dims = Vec3::new(10.0, 10.0, 10.0);
        let target = stowed("t", "c1", Vec3::zero(), dims);
        let above = stowed("a", "c1", Vec3::new(5.0, 5.0, 10.0), dims);
        let beside = stowed("b", "c1", Vec3::new(10.0, 0.0, 10.0), dims);
        let level = stowed("l", "c1", Vec3::new(5.0, 5.0, 0.0), dims);
        let elsewhere = stowed("e", "c2", Vec3::new(0.0, 0.0, 10.0), dims);

        assert!(blocks(&above, &target));
        assert!(!blocks(&beside, &target));
        assert!(!blocks(&level, &target));
        assert!(!blocks(&elsewhere, &target));
        assert!(!blocks(&target, &target));
        assert!(!blocks(&target, &above));
    }
}
