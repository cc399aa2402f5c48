//! Single-linkage dendrogram from a reachability ordering.
//!
//! In a reachability plot, the single-linkage clusters at threshold `t` are
//! exactly the maximal runs of consecutive positions whose reach (after the
//! first) is `<= t`. Processing positions by increasing reach and joining the
//! run ending at `k - 1` with the run starting at `k` therefore replays the
//! agglomerative merge sequence without touching the dissimilarity array.

use super::reachability::Reachability;
use super::Dendrogram;
use crate::error::{Error, Result};

/// Build the linkage matrix described by `reachability`.
///
/// Internal node ids are assigned in order of increasing height, ties broken
/// by position in the traversal. Children are stored in ascending id order.
pub fn linkage_from_reachability(reachability: &Reachability) -> Result<Dendrogram> {
    let Reachability { order, reach } = reachability;
    let n = order.len();
    if reach.len() != n {
        return Err(Error::DimensionMismatch {
            what: "reachability distances",
            expected: n,
            found: reach.len(),
        });
    }
    let mut seen = vec![false; n];
    for &o in order {
        if o >= n || seen[o] {
            return Err(Error::Other(format!(
                "reachability order is not a permutation of 0..{n}"
            )));
        }
        seen[o] = true;
    }

    let mut dendro = Dendrogram::new(n);
    if n < 2 {
        return Ok(dendro);
    }

    let mut positions: Vec<usize> = (1..n).collect();
    positions.sort_by(|&a, &b| reach[a].total_cmp(&reach[b]).then(a.cmp(&b)));

    // Union-find over traversal positions; each root remembers its node id.
    let mut runs = Runs::new(order);
    for k in positions {
        let left = runs.find(k - 1);
        let right = runs.find(k);
        let (a, b) = (runs.node[left], runs.node[right]);
        let size = dendro.size(a) + dendro.size(b);
        let id = n + dendro.n_merges();
        dendro.add_merge(a, b, reach[k], size);
        runs.union(left, right, id);
    }
    Ok(dendro)
}

struct Runs {
    parent: Vec<usize>,
    node: Vec<usize>,
}

impl Runs {
    fn new(order: &[usize]) -> Self {
        Self {
            parent: (0..order.len()).collect(),
            node: order.to_vec(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize, node: usize) {
        self.parent[b] = a;
        self.node[a] = node;
    }
}
