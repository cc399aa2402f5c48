//! # cobin
//!
//! Density-aware hierarchical binning of metagenomic contigs.
//!
//! Contigs are compared by coverage and k-mer signature, ordered by an
//! OPTICS-style reachability traversal, and organised into a single-linkage
//! dendrogram. A flat cut of that dendrogram is then chosen using per-cluster
//! quality scores (from marker-gene taxonomy) and a minimum bin standard.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`distance`] | condensed arrays, weighted ranks, density distance, cache port |
//! | [`hierarchy`] | dendrogram, reachability ordering, linkage, tree algorithms |
//! | [`quality`] | node scorers and minimum-standard predicates |
//! | [`cluster`] | flat cluster extractor and binning engines |
//!
//! The crate logs progress through the [`log`] facade and never installs a
//! logger itself.

pub mod cluster;
pub mod distance;
/// Error types used across `cobin`.
pub mod error;
pub mod hierarchy;
pub mod quality;

#[cfg(test)]
mod hierarchy_tests;

pub use error::{Error, Result};

pub use cluster::{
    Binning, BinningConfig, ClassificationEngine, ClusterEngine, FlatClusterExtractor,
    FlatClusters, Profile,
};
pub use distance::{DensityDistance, DistanceCache};
pub use hierarchy::{linkage_from_reachability, reachability_order, Dendrogram, Reachability};
pub use quality::{MarkerMapping, MarkerMappings};
