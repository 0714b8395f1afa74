//! Item lookup by identifier or name.

use std::cmp::Ordering;

use crate::model::Item;

/// All items matching `query`, best candidate first.
///
/// An exact identifier match is returned alone. Otherwise every item whose
/// name contains the query (case-insensitive) matches, ordered by:
/// stowed before in-hand, soonest expiry (no expiry last), higher priority,
/// then id.
pub fn rank_matches<'a>(query: &str, items: &'a [Item]) -> Vec<&'a Item> {
    let needle = query.trim();
    if needle.is_empty() {
        return Vec::new();
    }
    if let Some(exact) = items.iter().find(|item| item.id == needle) {
        return vec![exact];
    }

    let lowered = needle.to_lowercase();
    let mut matches: Vec<&Item> = items
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&lowered))
        .collect();
    matches.sort_by(|a, b| compare_candidates(a, b));
    matches
}

/// Best match for `query`, if any.
pub fn search<'a>(query: &str, items: &'a [Item]) -> Option<&'a Item> {
    rank_matches(query, items).into_iter().next()
}

fn compare_candidates(a: &Item, b: &Item) -> Ordering {
    b.position
        .is_some()
        .cmp(&a.position.is_some())
        .then_with(|| match (a.expiry_date, b.expiry_date) {
            (Some(a_expiry), Some(b_expiry)) => a_expiry.cmp(&b_expiry),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.id.cmp(&b.id))
}
