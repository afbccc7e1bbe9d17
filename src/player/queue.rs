//! Traversal order over the catalog.
//!
//! The order is a permutation of catalog indices: identity when shuffle is
//! off, a random permutation starting at the current track when it is on.
//! Stepping wraps around in both directions.

use rand::seq::SliceRandom;

pub(crate) fn build_order(len: usize, shuffle: bool, current: Option<usize>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if !shuffle || len < 2 {
        return order;
    }

    order.shuffle(&mut rand::rng());
    // Keep the current track first so a full cycle visits every other track.
    if let Some(cur) = current.filter(|&c| c < len) {
        if let Some(pos) = order.iter().position(|&i| i == cur) {
            order.swap(0, pos);
        }
    }
    order
}

/// The index after (or before) `current` in `order`, wrapping at both ends.
pub(crate) fn step(order: &[usize], current: usize, forward: bool) -> Option<usize> {
    if order.is_empty() {
        return None;
    }
    let len = order.len();
    let pos = order.iter().position(|&i| i == current);
    let next_pos = match (pos, forward) {
        (Some(p), true) => (p + 1) % len,
        (Some(0), false) => len - 1,
        (Some(p), false) => p - 1,
        (None, true) => 0,
        (None, false) => len - 1,
    };
    Some(order[next_pos])
}
