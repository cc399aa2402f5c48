//! Reachability ordering of a condensed dissimilarity array.
//!
//! This is OPTICS with an unbounded radius and a neighbourhood of one, which
//! reduces to Prim's algorithm: keep, for every unvisited point, its smallest
//! dissimilarity to the visited set, and repeatedly visit the closest point.
//! The visit order together with the attaching dissimilarities is a complete
//! summary of the single-linkage hierarchy.
//!
//! Time and memory are O(n²) against the full condensed array.

use crate::distance::{check_condensed, condensed_index};
use crate::error::Result;

/// Traversal order and reachability distances.
#[derive(Debug, Clone, PartialEq)]
pub struct Reachability {
    /// Original observation indices in traversal order.
    pub order: Vec<usize>,
    /// `reach[k]` is the dissimilarity at which `order[k]` attaches to
    /// `order[..k]`. `reach[0]` is a `0.0` sentinel.
    pub reach: Vec<f64>,
}

impl Reachability {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no observations.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Compute the reachability ordering of `y`, starting from observation 0.
///
/// Among equally close candidates the lowest observation index is visited
/// first, so the result is fully deterministic.
pub fn reachability_order(y: &[f64]) -> Result<Reachability> {
    // An empty array is read as a single observation.
    let n = check_condensed(y)?;
    Ok(reachability_order_n(y, n))
}

pub(crate) fn reachability_order_n(y: &[f64], n: usize) -> Reachability {
    let mut order = Vec::with_capacity(n);
    let mut reach = Vec::with_capacity(n);
    if n == 0 {
        return Reachability { order, reach };
    }

    let mut visited = vec![false; n];
    let mut min_dist = vec![f64::INFINITY; n];
    let mut current = 0;
    visited[current] = true;
    order.push(current);
    reach.push(0.0);

    for _ in 1..n {
        let mut best: Option<usize> = None;
        for j in 0..n {
            if visited[j] {
                continue;
            }
            let d = y[condensed_index(n, current, j)];
            if d < min_dist[j] {
                min_dist[j] = d;
            }
            best = match best {
                Some(b) if min_dist[b] <= min_dist[j] => Some(b),
                _ => Some(j),
            };
        }
        // n >= 2 here so an unvisited point always exists
        let Some(next) = best else { break };
        visited[next] = true;
        order.push(next);
        reach.push(min_dist[next]);
        current = next;
    }

    Reachability { order, reach }
}
