//! Quadratic node split.
//!
//! Splits an overflowing list of `N + 1` boxed items into two groups that
//! each hold at least `min_entries` items. Works the same for leaf entries
//! and child references.

use crate::bounding_box::BoundingBox;

use super::rtree_node::Bounded;

/// Split `items` into two groups using the quadratic-cost heuristic.
///
/// Ties are resolved deterministically (first candidate wins), so the same
/// input always produces the same split.
pub fn quadratic_split<T: Bounded>(items: Vec<T>, min_entries: usize) -> (Vec<T>, Vec<T>) {
    debug_assert!(items.len() >= 2, "cannot split fewer than two items");
    debug_assert!(items.len() >= 2 * min_entries, "groups cannot reach min_entries");

    let (seed_a, seed_b) = pick_seeds(&items);
    let mut pending: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut remaining = pending.len() - 2;

    let mut first = Vec::new();
    let mut second = Vec::new();
    let mut first_box = BoundingBox::empty();
    let mut second_box = BoundingBox::empty();

    if let Some(item) = pending[seed_a].take() {
        first_box = item.bbox();
        first.push(item);
    }
    if let Some(item) = pending[seed_b].take() {
        second_box = item.bbox();
        second.push(item);
    }

    while remaining > 0 {
        // Mandatory distribution: a group that needs every remaining item to
        // reach min_entries gets them all (the other group already holds
        // N - min_entries + 1).
        if first.len() + remaining <= min_entries {
            first.extend(pending.iter_mut().filter_map(Option::take));
            break;
        }
        if second.len() + remaining <= min_entries {
            second.extend(pending.iter_mut().filter_map(Option::take));
            break;
        }

        let Some(next) = pick_next(&pending, &first_box, &second_box) else {
            break;
        };
        let Some(item) = pending[next].take() else {
            break;
        };
        remaining -= 1;

        let bbox = item.bbox();
        if prefers_first(&bbox, &first_box, first.len(), &second_box, second.len()) {
            first_box.expand(&bbox);
            first.push(item);
        } else {
            second_box.expand(&bbox);
            second.push(item);
        }
    }

    (first, second)
}

/// The pair wasting the most area when covered by one box
fn pick_seeds<T: Bounded>(items: &[T]) -> (usize, usize) {
    let mut seeds = (0, 1);
    let mut worst = f64::NEG_INFINITY;

    for i in 0..items.len() {
        let a = items[i].bbox();
        for (j, item) in items.iter().enumerate().skip(i + 1) {
            let b = item.bbox();
            let waste = a.union(&b).area() - a.area() - b.area();
            if waste > worst {
                worst = waste;
                seeds = (i, j);
            }
        }
    }
    seeds
}

/// The unassigned item with the strongest preference for one group
fn pick_next<T: Bounded>(
    pending: &[Option<T>],
    first_box: &BoundingBox,
    second_box: &BoundingBox,
) -> Option<usize> {
    let mut best = None;
    let mut best_diff = f64::NEG_INFINITY;

    for (i, item) in pending.iter().enumerate() {
        if let Some(item) = item {
            let bbox = item.bbox();
            let diff = (first_box.enlargement(&bbox) - second_box.enlargement(&bbox)).abs();
            if best.is_none() || diff > best_diff {
                best_diff = diff;
                best = Some(i);
            }
        }
    }
    best
}

/// Least enlargement, then smaller resulting area, then fewer members
fn prefers_first(
    bbox: &BoundingBox,
    first_box: &BoundingBox,
    first_len: usize,
    second_box: &BoundingBox,
    second_len: usize,
) -> bool {
    let d1 = first_box.enlargement(bbox);
    let d2 = second_box.enlargement(bbox);
    if d1 != d2 {
        return d1 < d2;
    }

    let area1 = first_box.union(bbox).area();
    let area2 = second_box.union(bbox).area();
    if area1 != area2 {
        return area1 < area2;
    }

    first_len <= second_len
}
