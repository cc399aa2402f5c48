//! Generic algorithms over a [`Dendrogram`].
//!
//! All functions are pure: they read the linkage and return new owned arrays.
//! Per-node arrays are indexed by node id (`0..2n-1`); per-row arrays are
//! indexed by merge row (`0..n-1`, node `n + row`).

use super::Dendrogram;
use crate::error::{Error, Result};
use std::ops::Add;

/// How two disjoint subtree values combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Keep the larger value.
    Max,
    /// Sum both values.
    Add,
}

impl Combine {
    #[inline]
    fn apply<T: Copy + PartialOrd + Add<Output = T>>(self, a: T, b: T) -> T {
        match self {
            Combine::Max => {
                if b > a {
                    b
                } else {
                    a
                }
            }
            Combine::Add => a + b,
        }
    }
}

/// A flat partition of the leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatPartition {
    /// `ids[leaf]` is the 0-based cluster of each leaf.
    pub ids: Vec<usize>,
    /// `leaders[leaf]` is the node id of the cluster root containing each leaf.
    pub leaders: Vec<usize>,
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_nodes(z: &Dendrogram, nodes: &[usize]) -> Result<()> {
    let n_nodes = z.n_nodes();
    match nodes.iter().find(|&&v| v >= n_nodes) {
        Some(&node) => Err(Error::InvalidNode { node, n_nodes }),
        None => Ok(()),
    }
}

/// Representative row of every row under equal-height chains.
///
/// Nested merges at the same height encode one multi-way split ambiguously.
/// `flat[row]` is the row of the highest ancestor reachable from `row` through
/// parents of equal height, or `row` itself when its parent is higher.
pub fn flatten_nodes(z: &Dendrogram) -> Vec<usize> {
    let n = z.n_items();
    let parents = z.parents();
    let mut flat: Vec<usize> = (0..z.n_merges()).collect();
    // Parents have larger ids, so a reverse pass sees them first.
    for row in (0..z.n_merges()).rev() {
        if let Some(p) = parents[n + row] {
            if z.height(p) == z.height(n + row) {
                flat[row] = flat[p - n];
            }
        }
    }
    flat
}

/// Node id of the flattened representative of `node`.
#[inline]
pub fn flat_node(z: &Dendrogram, flat: &[usize], node: usize) -> usize {
    if z.is_leaf(node) {
        node
    } else {
        z.n_items() + flat[node - z.n_items()]
    }
}

/// Best value of any antichain in each node's subtree, the node included.
///
/// `best(leaf) = values[leaf]` and, for a node with children `a` and `b`,
/// `best(node) = max(values[node], combine(best(a), best(b)))`.
pub fn max_scores<T>(z: &Dendrogram, values: &[T], combine: Combine) -> Result<Vec<T>>
where
    T: Copy + PartialOrd + Add<Output = T>,
{
    check_len("node values", z.n_nodes(), values.len())?;
    let n = z.n_items();
    let mut best = values.to_vec();
    for (row, m) in z.merges().enumerate() {
        let below = combine.apply(best[m.cluster_a], best[m.cluster_b]);
        if below > values[n + row] {
            best[n + row] = below;
        }
    }
    Ok(best)
}

/// Best value of any antichain strictly below each internal node.
///
/// One entry per merge row: `combine(best(a), best(b))` with `best` as in
/// [`max_scores`].
pub fn max_scores_below<T>(z: &Dendrogram, values: &[T], combine: Combine) -> Result<Vec<T>>
where
    T: Copy + PartialOrd + Add<Output = T>,
{
    let best = max_scores(z, values, combine)?;
    Ok(z
        .merges()
        .map(|m| combine.apply(best[m.cluster_a], best[m.cluster_b]))
        .collect())
}

/// Flat clusters from a per-row merge mask.
///
/// `merge[row] == true` keeps the whole subtree of node `n + row` together. A
/// leaf's leader is its highest ancestor whose row is set, or the leaf itself.
/// Cluster ids are numbered in depth-first, left-to-right order.
pub fn fcluster_merge(z: &Dendrogram, merge: &[bool]) -> Result<FlatPartition> {
    check_len("merge mask", z.n_merges(), merge.len())?;
    let n = z.n_items();
    let mut ids = vec![0; n];
    let mut leaders = vec![0; n];
    let Some(root) = z.root() else {
        return Ok(FlatPartition { ids, leaders });
    };

    let mut next = 0;
    let mut stack = vec![root];
    while let Some(v) = stack.pop() {
        match z.children(v) {
            Some((a, b)) if !merge[v - n] => {
                stack.push(b);
                stack.push(a);
            }
            _ => {
                for leaf in z.leaves(v) {
                    ids[leaf] = next;
                    leaders[leaf] = v;
                }
                next += 1;
            }
        }
    }
    Ok(FlatPartition { ids, leaders })
}

/// Sorted union of the ancestors of `nodes`.
///
/// With `inclusive` the nodes themselves are included.
pub fn ancestors(z: &Dendrogram, nodes: &[usize], inclusive: bool) -> Result<Vec<usize>> {
    check_nodes(z, nodes)?;
    let parents = z.parents();
    let mut mark = vec![false; z.n_nodes()];
    for &v in nodes {
        let mut p = parents[v];
        while let Some(u) = p {
            if mark[u] {
                break;
            }
            mark[u] = true;
            p = parents[u];
        }
    }
    if inclusive {
        nodes.iter().for_each(|&v| mark[v] = true);
    }
    Ok(marked(&mark))
}

/// Sorted union of the descendants of `nodes`.
///
/// With `inclusive` the nodes themselves are included.
pub fn descendants(z: &Dendrogram, nodes: &[usize], inclusive: bool) -> Result<Vec<usize>> {
    check_nodes(z, nodes)?;
    let mut mark = vec![false; z.n_nodes()];
    let mut stack = Vec::new();
    for &v in nodes {
        if let Some((a, b)) = z.children(v) {
            stack.push(a);
            stack.push(b);
        }
        while let Some(u) = stack.pop() {
            if mark[u] {
                continue;
            }
            mark[u] = true;
            if let Some((a, b)) = z.children(u) {
                stack.push(a);
                stack.push(b);
            }
        }
    }
    if inclusive {
        nodes.iter().for_each(|&v| mark[v] = true);
    }
    Ok(marked(&mark))
}

fn marked(mark: &[bool]) -> Vec<usize> {
    mark.iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect()
}

/// Position of every node in the tree induced by a subset of leaves.
///
/// The induced tree keeps the leaves in `indices` and every node where both
/// subtrees contain kept leaves. `embed[node]` is the induced node covering the
/// same kept leaves as `node`, or `None` when `node` has no kept leaves. The
/// last entry is therefore the root of the induced tree.
pub fn embed_nodes(z: &Dendrogram, indices: &[usize]) -> Result<Vec<Option<usize>>> {
    check_nodes(z, indices)?;
    let n = z.n_items();
    let mut embed = vec![None; z.n_nodes()];
    for &leaf in indices {
        if leaf >= n {
            return Err(Error::InvalidNode {
                node: leaf,
                n_nodes: n,
            });
        }
        embed[leaf] = Some(leaf);
    }
    for (row, m) in z.merges().enumerate() {
        embed[n + row] = match (embed[m.cluster_a], embed[m.cluster_b]) {
            (Some(_), Some(_)) => Some(n + row),
            (Some(e), None) | (None, Some(e)) => Some(e),
            (None, None) => None,
        };
    }
    Ok(embed)
}
