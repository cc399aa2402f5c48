//! Taxonomic distance between marker mapping lineages.

/// Distance between two taxonomy strings.
///
/// Implementations must be symmetric and return 0 for identical inputs.
pub trait TaxonomicDistance {
    /// Distance between lineages `a` and `b`.
    fn distance(&self, a: &str, b: &str) -> f64;
}

/// Rank-based distance between `;`-separated lineages.
///
/// Lineages are compared rank by rank from the root. The distance is the
/// number of ranks of the less resolved lineage that are not shared, so a
/// lineage is at distance 0 from any refinement of itself:
///
/// ```
/// use cobin::quality::{LineageDistance, TaxonomicDistance};
///
/// let d = LineageDistance;
/// assert_eq!(d.distance("Bacteria; Firmicutes", "Bacteria; Firmicutes; Bacilli"), 0.0);
/// assert_eq!(d.distance("Bacteria; Firmicutes", "Bacteria; Proteobacteria"), 1.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineageDistance;

impl LineageDistance {
    /// Ranks of a lineage, trimmed, with empty ranks dropped.
    pub fn ranks(lineage: &str) -> Vec<&str> {
        lineage
            .split(';')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect()
    }
}

impl TaxonomicDistance for LineageDistance {
    fn distance(&self, a: &str, b: &str) -> f64 {
        let a = Self::ranks(a);
        let b = Self::ranks(b);
        let shared = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
        (a.len().min(b.len()) - shared) as f64
    }
}
