//! Dendrogram (linkage matrix) for hierarchical clustering.
//!
//! Node ids follow the SciPy/`kodama` convention:
//! - leaves: `0..n`
//! - the merge in row `i` creates node `n + i`
//!
//! Every row's children have smaller ids than the node it creates, so a single
//! forward pass over the rows is a bottom-up traversal.

use crate::error::{Error, Result};

/// A dendrogram representing hierarchical cluster merges.
///
/// Each merge combines two clusters into one, recording:
/// - Which clusters were merged
/// - The height at which they merged
/// - The number of leaves below the new node
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    /// Merge history, one row per internal node.
    merges: Vec<Merge>,
    /// Number of original items.
    n_items: usize,
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// First cluster being merged (node id).
    pub cluster_a: usize,
    /// Second cluster being merged (node id).
    pub cluster_b: usize,
    /// Height at which merge occurred.
    pub height: f64,
    /// Number of leaves in the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create an empty dendrogram for n items.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge operation.
    ///
    /// Children are stored in ascending id order.
    pub fn add_merge(&mut self, cluster_a: usize, cluster_b: usize, height: f64, size: usize) {
        let (cluster_a, cluster_b) = if cluster_a <= cluster_b {
            (cluster_a, cluster_b)
        } else {
            (cluster_b, cluster_a)
        };
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            height,
            size,
        });
    }

    /// Build from SciPy-style rows `[child_a, child_b, height, size]`.
    ///
    /// Rows are validated: children must be existing, unmerged nodes with
    /// smaller ids, sizes must be consistent, and no row may sit below either
    /// of its children.
    pub fn from_rows(rows: &[[f64; 4]]) -> Result<Self> {
        let n_items = rows.len() + 1;
        let mut dendro = Self::new(n_items);
        let mut merged = vec![false; 2 * n_items - 1];
        for (row, r) in rows.iter().enumerate() {
            let node = n_items + row;
            let mut children = [0usize; 2];
            for (slot, &v) in children.iter_mut().zip(&r[..2]) {
                if v < 0.0 || v.fract() != 0.0 || v as usize >= node {
                    return Err(Error::InvalidLinkage {
                        row,
                        message: format!("child {v} is not an earlier node"),
                    });
                }
                *slot = v as usize;
            }
            let [a, b] = children;
            if a == b || merged[a] || merged[b] {
                return Err(Error::InvalidLinkage {
                    row,
                    message: format!("children {a} and {b} are not two unmerged nodes"),
                });
            }
            merged[a] = true;
            merged[b] = true;
            let size = dendro.size(a) + dendro.size(b);
            if r[3] != size as f64 {
                return Err(Error::InvalidLinkage {
                    row,
                    message: format!("size {} does not match {size} leaves", r[3]),
                });
            }
            if !(r[2] >= 0.0) {
                return Err(Error::InvalidLinkage {
                    row,
                    message: format!("height {} is negative", r[2]),
                });
            }
            let floor = dendro.height(a).max(dendro.height(b));
            if r[2] < floor {
                return Err(Error::InvalidLinkage {
                    row,
                    message: format!("height {} is below child height {floor}", r[2]),
                });
            }
            dendro.add_merge(a, b, r[2], size);
        }
        Ok(dendro)
    }

    /// SciPy-style rows `[child_a, child_b, height, size]`.
    pub fn to_rows(&self) -> Vec<[f64; 4]> {
        self.merges
            .iter()
            .map(|m| {
                [
                    m.cluster_a as f64,
                    m.cluster_b as f64,
                    m.height,
                    m.size as f64,
                ]
            })
            .collect()
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Total number of nodes (`2n - 1` for a complete tree).
    pub fn n_nodes(&self) -> usize {
        self.n_items + self.merges.len()
    }

    /// Whether `node` is an original item.
    #[inline]
    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.n_items
    }

    /// The root node id, if any nodes exist.
    pub fn root(&self) -> Option<usize> {
        self.n_nodes().checked_sub(1)
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge row `row`.
    pub fn merge(&self, row: usize) -> &Merge {
        &self.merges[row]
    }

    /// Children of `node`, or `None` for a leaf.
    #[inline]
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        node.checked_sub(self.n_items)
            .map(|row| (self.merges[row].cluster_a, self.merges[row].cluster_b))
    }

    /// Merge height of `node` (0 for leaves).
    pub fn height(&self, node: usize) -> f64 {
        node.checked_sub(self.n_items)
            .map_or(0.0, |row| self.merges[row].height)
    }

    /// Leaf count below `node`.
    pub fn size(&self, node: usize) -> usize {
        node.checked_sub(self.n_items)
            .map_or(1, |row| self.merges[row].size)
    }

    /// Get the merge heights, one per row.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.height).collect()
    }

    /// Parent of every node (`None` for the root).
    pub fn parents(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.n_nodes()];
        for (row, m) in self.merges.iter().enumerate() {
            parents[m.cluster_a] = Some(self.n_items + row);
            parents[m.cluster_b] = Some(self.n_items + row);
        }
        parents
    }

    /// Leaves below `node`, in left-to-right order.
    pub fn leaves(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.size(node));
        let mut stack = vec![node];
        while let Some(v) = stack.pop() {
            match self.children(v) {
                Some((a, b)) => {
                    stack.push(b);
                    stack.push(a);
                }
                None => out.push(v),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> Dendrogram {
        Dendrogram::from_rows(&[
            [1., 3., 1., 2.],
            [2., 4., 1., 3.],
            [0., 5., 2., 4.],
        ])
        .unwrap()
    }

    #[test]
    fn test_dendrogram_creation() {
        let dendro = Dendrogram::new(5);
        assert_eq!(dendro.n_items(), 5);
        assert_eq!(dendro.n_merges(), 0);
    }

    #[test]
    fn test_dendrogram_merge() {
        let mut dendro = Dendrogram::new(4);
        dendro.add_merge(1, 0, 0.5, 2);
        dendro.add_merge(2, 3, 0.7, 2);
        dendro.add_merge(4, 5, 1.0, 4);

        assert_eq!(dendro.n_merges(), 3);
        assert_eq!(dendro.children(4), Some((0, 1)));
        assert_eq!(dendro.root(), Some(6));
    }

    #[test]
    fn node_accessors() {
        let z = skewed();
        assert_eq!(z.n_nodes(), 7);
        assert_eq!(z.children(6), Some((0, 5)));
        assert_eq!(z.children(3), None);
        assert_eq!(z.height(5), 1.0);
        assert_eq!(z.height(2), 0.0);
        assert_eq!(z.size(6), 4);
        assert_eq!(z.size(0), 1);
        assert_eq!(z.leaves(5), vec![2, 1, 3]);
        assert_eq!(
            z.parents(),
            vec![Some(6), Some(4), Some(5), Some(4), Some(5), Some(6), None]
        );
    }

    #[test]
    fn rows_roundtrip() {
        let rows = [[1., 3., 1., 2.], [2., 4., 1., 3.], [0., 5., 2., 4.]];
        assert_eq!(Dendrogram::from_rows(&rows).unwrap().to_rows(), rows.to_vec());
    }

    #[test]
    fn rejects_malformed_rows() {
        // forward reference
        assert!(matches!(
            Dendrogram::from_rows(&[[0., 3., 1., 2.], [1., 2., 1., 3.]]),
            Err(Error::InvalidLinkage { row: 0, .. })
        ));
        // a leaf id above the merged node is still a valid child
        assert!(Dendrogram::from_rows(&[[0., 2., 1., 2.], [1., 3., 1., 3.]]).is_ok());
        // child merged twice
        assert!(Dendrogram::from_rows(&[[0., 1., 1., 2.], [0., 3., 1., 3.]]).is_err());
        // wrong size
        assert!(Dendrogram::from_rows(&[[0., 1., 1., 3.]]).is_err());
        // negative height
        assert!(Dendrogram::from_rows(&[[0., 1., -1., 2.]]).is_err());
    }

    #[test]
    fn rejects_rows_below_their_children() {
        assert!(matches!(
            Dendrogram::from_rows(&[[0., 1., 2., 2.], [2., 3., 1., 3.]]),
            Err(Error::InvalidLinkage { row: 1, .. })
        ));
        // equal heights form a chain, which is allowed
        assert!(Dendrogram::from_rows(&[[0., 1., 2., 2.], [2., 3., 2., 3.]]).is_ok());
    }
}
