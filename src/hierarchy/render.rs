//! Text rendering of a dendrogram pruned to a subset of leaves.

use super::algorithms::{embed_nodes, flat_node, flatten_nodes};
use super::Dendrogram;
use crate::error::Result;

/// Render the tree induced by `indices` as indented lines.
///
/// `root` selects the subtree to draw (defaults to the whole tree). Nodes joined
/// by equal-height merges are drawn as one node with all their children.
/// `node_label` receives the flattened representative of each drawn node;
/// leaves are labelled `node_label(leaf) + leaf_label(leaf)`.
///
/// ```text
/// :1.00[9000bp,n=3]
///   |-:0.00[1000bp,n=1]'contig_2
///   |-:0.50[8000bp,n=2]
///   |---:0.00[5000bp,n=1]'contig_0
///   |---:0.00[3000bp,n=1]'contig_1
/// ```
pub fn render_tree<L, N>(
    z: &Dendrogram,
    indices: &[usize],
    root: Option<usize>,
    leaf_label: L,
    node_label: N,
) -> Result<Vec<String>>
where
    L: Fn(usize) -> String,
    N: Fn(usize) -> String,
{
    let embed = embed_nodes(z, indices)?;
    let flat = flatten_nodes(z);
    let start = match root.or_else(|| z.root()) {
        Some(r) => embed.get(r).copied().flatten(),
        None => None,
    };
    let Some(start) = start else {
        return Ok(Vec::new());
    };

    let tree = Induced {
        z,
        embed: &embed,
        flat: &flat,
    };
    Ok(tree
        .lines(start, &leaf_label, &node_label)
        .into_iter()
        .map(|l| {
            if l.starts_with('-') {
                l.replacen('-', "  |", 1)
            } else {
                l
            }
        })
        .collect())
}

struct Induced<'a> {
    z: &'a Dendrogram,
    embed: &'a [Option<usize>],
    flat: &'a [usize],
}

impl Induced<'_> {
    fn children(&self, node: usize, out: &mut Vec<usize>) {
        let Some((a, b)) = self.z.children(node) else {
            return;
        };
        let rep = flat_node(self.z, self.flat, node);
        for c in [a, b] {
            match self.embed[c] {
                None => {}
                Some(e) if !self.z.is_leaf(e) && flat_node(self.z, self.flat, e) == rep => {
                    self.children(e, out)
                }
                Some(e) => out.push(e),
            }
        }
    }

    fn lines(
        &self,
        node: usize,
        leaf_label: &dyn Fn(usize) -> String,
        node_label: &dyn Fn(usize) -> String,
    ) -> Vec<String> {
        if self.z.is_leaf(node) {
            return vec![node_label(node) + &leaf_label(node)];
        }
        let mut out = vec![node_label(flat_node(self.z, self.flat, node))];
        let mut children = Vec::new();
        self.children(node, &mut children);
        for c in children {
            out.extend(
                self.lines(c, leaf_label, node_label)
                    .into_iter()
                    .map(|l| format!("--{l}")),
            );
        }
        out
    }
}
