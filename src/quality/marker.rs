//! Marker-gene cluster quality.
//!
//! Single-copy marker genes found on contigs are mapped to a lineage. Two
//! signals follow:
//! - mappings with compatible lineages probably come from the same genome;
//! - two copies of the same marker probably come from different genomes.
//!
//! The score is an adjusted BCubed measure over the mappings of a cluster.
//! Precision rewards clusters whose mappings are taxonomically consistent and
//! carry distinct markers. Recall rewards clusters that hold most of the
//! compatible, distinct markers available to each mapping.

use super::{leaf_data_scores, ClusterScorer, LeafDataScore, TaxonomicDistance};
use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use ndarray::{Array2, ArrayView2};
use std::collections::{BTreeMap, HashMap};

/// Default taxonomic distance below which two mappings are compatible.
pub const DEFAULT_TAXONOMY_THRESHOLD: f64 = 1.0;

/// Default weight of recall against precision.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// One marker gene found on a contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMapping {
    /// Index of the contig carrying the marker.
    pub contig: usize,
    /// Marker gene name.
    pub marker: String,
    /// `;`-separated lineage assigned to the marker hit.
    pub taxonomy: String,
}

impl MarkerMapping {
    /// Create a mapping.
    pub fn new(contig: usize, marker: impl Into<String>, taxonomy: impl Into<String>) -> Self {
        Self {
            contig,
            marker: marker.into(),
            taxonomy: taxonomy.into(),
        }
    }
}

/// The marker mapping table of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerMappings {
    mappings: Vec<MarkerMapping>,
}

impl MarkerMappings {
    /// Wrap a list of mappings.
    pub fn new(mappings: Vec<MarkerMapping>) -> Self {
        Self { mappings }
    }

    /// Append a mapping.
    pub fn push(&mut self, mapping: MarkerMapping) {
        self.mappings.push(mapping);
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Iterate over mappings.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerMapping> {
        self.mappings.iter()
    }

    /// Mapping indices grouped by contig, in ascending contig order.
    pub fn iter_indices(&self) -> impl Iterator<Item = (usize, Vec<usize>)> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, m) in self.mappings.iter().enumerate() {
            groups.entry(m.contig).or_default().push(i);
        }
        groups.into_iter()
    }

    /// Check that every mapping refers to one of `n_contigs` contigs.
    pub fn check_contigs(&self, n_contigs: usize) -> Result<()> {
        match self.mappings.iter().find(|m| m.contig >= n_contigs) {
            Some(m) => Err(Error::Other(format!(
                "marker {} mapped to contig {} of {n_contigs}",
                m.marker, m.contig
            ))),
            None => Ok(()),
        }
    }
}

impl FromIterator<MarkerMapping> for MarkerMappings {
    fn from_iter<I: IntoIterator<Item = MarkerMapping>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Cluster scores from marker taxonomy and marker redundancy.
#[derive(Debug, Clone)]
pub struct MarkerCheckScorer {
    /// `compatible[[i, j]]`: mappings `i` and `j` are taxonomically close.
    compatible: Array2<bool>,
    /// Interned marker name of each mapping.
    marker_ids: Vec<usize>,
    n_markers: usize,
    /// `1 / copies` of each mapping's marker.
    copy_scale: Vec<f64>,
    /// `1 / distinct markers` among all mappings compatible with each mapping.
    group_scale: Vec<f64>,
    leaves: HashMap<usize, Vec<usize>>,
    alpha: f64,
}

impl MarkerCheckScorer {
    /// Prepare a scorer for `mappings`.
    ///
    /// Mappings at taxonomic distance below `threshold` are compatible.
    pub fn new<D>(mappings: &MarkerMappings, distance: &D, threshold: f64) -> Self
    where
        D: TaxonomicDistance + ?Sized,
    {
        let m = mappings.len();
        let items = &mappings.mappings;

        let mut compatible = Array2::from_elem((m, m), 0.0 < threshold);
        for i in 0..m {
            for j in (i + 1)..m {
                let close = distance.distance(&items[i].taxonomy, &items[j].taxonomy) < threshold;
                compatible[[i, j]] = close;
                compatible[[j, i]] = close;
            }
        }

        let mut names: HashMap<&str, usize> = HashMap::new();
        let marker_ids: Vec<usize> = items
            .iter()
            .map(|mp| {
                let next = names.len();
                *names.entry(mp.marker.as_str()).or_insert(next)
            })
            .collect();
        let n_markers = names.len();

        let mut copies = vec![0usize; n_markers];
        marker_ids.iter().for_each(|&id| copies[id] += 1);
        let copy_scale = marker_ids
            .iter()
            .map(|&id| 1.0 / copies[id] as f64)
            .collect();

        let mut scorer = Self {
            compatible,
            marker_ids,
            n_markers,
            copy_scale,
            group_scale: Vec::new(),
            leaves: mappings.iter_indices().collect(),
            alpha: DEFAULT_ALPHA,
        };
        let all: Vec<usize> = (0..m).collect();
        scorer.group_scale = scorer
            .group_sizes(&all)
            .into_iter()
            .map(|g| if g == 0 { 0.0 } else { 1.0 / g as f64 })
            .collect();
        scorer
    }

    /// Set the weight of recall against precision.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Weight of recall against precision.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Taxonomic compatibility of every pair of mappings.
    pub fn compatibility(&self) -> ArrayView2<'_, bool> {
        self.compatible.view()
    }

    /// `1 / copies` of each mapping's marker name.
    pub fn marker_copy_scale(&self) -> &[f64] {
        &self.copy_scale
    }

    /// `1 / g` of each mapping, where `g` is its compatible group size over
    /// all mappings. This is the recall weight.
    pub fn group_scale(&self) -> &[f64] {
        &self.group_scale
    }

    /// For each mapping in `items`, the number of distinct marker names among
    /// the members of `items` compatible with it.
    pub fn group_sizes(&self, items: &[usize]) -> Vec<usize> {
        let mut stamp = vec![usize::MAX; self.n_markers];
        items
            .iter()
            .enumerate()
            .map(|(k, &i)| {
                let mut distinct = 0;
                for &j in items {
                    let id = self.marker_ids[j];
                    if self.compatible[[i, j]] && stamp[id] != k {
                        stamp[id] = k;
                        distinct += 1;
                    }
                }
                distinct
            })
            .collect()
    }

    /// Precision and recall of a cluster holding mappings `items`.
    ///
    /// Recall weighs each member by [`group_scale`](Self::group_scale), so a
    /// cluster holding every compatible marker of a mapping scores `g - 1`.
    pub fn precision_recall(&self, items: &[usize]) -> (f64, f64) {
        if items.is_empty() {
            return (0.0, 0.0);
        }
        let len = items.len() as f64;
        let (mut precision, mut recall) = (0.0, 0.0);
        for (&i, g) in items.iter().zip(self.group_sizes(items)) {
            let g = g as f64;
            precision += g;
            recall += (g - 1.0) * g * self.group_scale[i];
        }
        (precision / len, recall / len)
    }
}

impl LeafDataScore for MarkerCheckScorer {
    fn leaf_data(&self) -> HashMap<usize, Vec<usize>> {
        self.leaves.clone()
    }

    fn score(&self, items: &[usize]) -> f64 {
        let (precision, recall) = self.precision_recall(items);
        self.alpha * recall + (1.0 - self.alpha) * precision
    }
}

impl ClusterScorer for MarkerCheckScorer {
    fn node_scores(&self, z: &Dendrogram) -> Result<Vec<f64>> {
        let n = z.n_items();
        if let Some(&contig) = self.leaves.keys().find(|&&c| c >= n) {
            return Err(Error::InvalidNode {
                node: contig,
                n_nodes: n,
            });
        }
        Ok(leaf_data_scores(z, self))
    }
}
