//! Dendrograms built from reachability orderings, and the tree algorithms the
//! binning stage runs over them.
//!
//! # Pipeline
//!
//! ```text
//! condensed dissimilarity ──reachability_order──▶ (order, reach)
//!                         ──linkage_from_reachability──▶ Dendrogram
//! ```
//!
//! The reachability ordering is an O(n²) Prim traversal; the linkage step is
//! O(n log n) and never looks at the dissimilarities again. The resulting
//! merge heights equal those of classic single-linkage clustering.
//!
//! # Tree algorithms
//!
//! | Function | Result |
//! |----------|--------|
//! | [`flatten_nodes`] | representative of each equal-height chain |
//! | [`max_scores`] / [`max_scores_below`] | best antichain value per subtree |
//! | [`fcluster_merge`] | flat clusters from a per-node merge mask |
//! | [`ancestors`] / [`descendants`] | closed node sets |
//! | [`embed_nodes`] | position in a leaf-restricted tree |
//!
//! ```text
//!         6 (height=2)
//!        / \
//!       0   5 (height=1)
//!          / \
//!         2   4 (height=1)
//!            / \
//!           1   3
//! ```
//!
//! Here rows 0 and 1 (nodes 4 and 5) are tied, so `flatten_nodes` maps row 0
//! to row 1 and the pair is scored as a single three-way split.

mod algorithms;
mod dendrogram;
mod linkage;
mod reachability;
mod render;

pub use algorithms::{
    ancestors, descendants, embed_nodes, fcluster_merge, flat_node, flatten_nodes, max_scores,
    max_scores_below, Combine, FlatPartition,
};
pub use dendrogram::{Dendrogram, Merge};
pub use linkage::linkage_from_reachability;
pub use reachability::{reachability_order, Reachability};
pub(crate) use reachability::reachability_order_n;
pub use render::render_tree;
