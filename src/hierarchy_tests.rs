//! Reference vectors for the tree algorithms and the reachability linkage,
//! plus cross-checks against `kodama`'s single linkage.

#[cfg(test)]
mod tests {
    use crate::cluster::{
        ClusterEngine, FlatClusterExtractor, FlatClusterPartitioner, Precomputed,
    };
    use crate::distance::condensed_len;
    use crate::hierarchy::{
        ancestors, fcluster_merge, flatten_nodes, linkage_from_reachability, max_scores,
        reachability_order, Combine, Dendrogram,
    };
    use crate::quality::{ClusterScorer, MinStandard};
    use crate::Result;
    use proptest::prelude::*;

    // 0-------+
    // 2---+   |-6
    // 1   |-5-+
    // |-4-+
    // 3
    fn skewed() -> Dendrogram {
        Dendrogram::from_rows(&[[1., 3., 1., 2.], [2., 4., 1., 3.], [0., 5., 2., 4.]]).unwrap()
    }

    // 0
    // |---7---+
    // 1       |
    //         |-8
    // 2---+   |
    // 3   |-6-+
    // |-5-+
    // 4
    fn balanced() -> Dendrogram {
        Dendrogram::from_rows(&[
            [3., 4., 1., 2.],
            [2., 5., 1., 3.],
            [0., 1., 3., 2.],
            [6., 7., 4., 5.],
        ])
        .unwrap()
    }

    fn seven_point() -> Dendrogram {
        Dendrogram::from_rows(&[
            [3., 4., 1., 2.],
            [0., 1., 2., 2.],
            [5., 6., 3., 2.],
            [2., 9., 3., 3.],
            [7., 8., 3., 4.],
            [10., 11., 3., 7.],
        ])
        .unwrap()
    }

    /// Same partition up to relabelling.
    fn isomorphic(a: &[usize], b: &[usize]) -> bool {
        a.len() == b.len()
            && (0..a.len()).all(|i| (0..a.len()).all(|j| (a[i] == a[j]) == (b[i] == b[j])))
    }

    #[test]
    fn flatten_equal_height_chains() {
        assert_eq!(flatten_nodes(&skewed()), vec![1, 1, 2]);
        assert_eq!(flatten_nodes(&seven_point()), vec![0, 1, 5, 5, 5, 5]);
        assert_eq!(flatten_nodes(&balanced()), vec![1, 1, 2, 3]);
    }

    #[test]
    fn max_scores_reference_vectors() -> Result<()> {
        let z = skewed();
        assert_eq!(
            max_scores(&z, &[1, 1, 0, 0, 1, 0, 0], Combine::Max)?,
            vec![1, 1, 0, 0, 1, 1, 1]
        );
        assert_eq!(
            max_scores(&z, &[0, 0, 0, 0, 2, 1, 0], Combine::Add)?,
            vec![0, 0, 0, 0, 2, 2, 2]
        );

        let z = balanced();
        assert_eq!(
            max_scores(&z, &[0, 1, 0, 2, 0, 2, 2, 1, 1], Combine::Max)?,
            vec![0, 1, 0, 2, 0, 2, 2, 1, 2]
        );
        assert_eq!(
            max_scores(&z, &[1, 1, 1, 1, 2, 0, 5, 0, 0], Combine::Add)?,
            vec![1, 1, 1, 1, 2, 3, 5, 2, 7]
        );
        Ok(())
    }

    #[test]
    fn fcluster_merge_reference_vectors() -> Result<()> {
        let z = skewed();
        let p = fcluster_merge(&z, &[true, false, false])?;
        assert_eq!(p.leaders, vec![0, 4, 2, 4]);
        assert!(isomorphic(&p.ids, &[1, 2, 3, 2]));
        let p = fcluster_merge(&z, &[false, true, false])?;
        assert_eq!(p.leaders, vec![0, 5, 5, 5]);
        assert!(isomorphic(&p.ids, &[1, 2, 2, 2]));

        let z = balanced();
        let p = fcluster_merge(&z, &[true, true, true, false])?;
        assert_eq!(p.leaders, vec![7, 7, 6, 6, 6]);
        assert!(isomorphic(&p.ids, &[1, 1, 2, 2, 2]));
        let p = fcluster_merge(&z, &[false, true, false, false])?;
        assert_eq!(p.leaders, vec![0, 1, 6, 6, 6]);
        assert!(isomorphic(&p.ids, &[1, 2, 3, 3, 3]));
        Ok(())
    }

    #[test]
    fn ancestors_reference_vectors() -> Result<()> {
        let z = balanced();
        assert_eq!(ancestors(&z, &[0, 1, 2, 3, 4], false)?, vec![5, 6, 7, 8]);
        assert_eq!(ancestors(&z, &[1], false)?, vec![7, 8]);
        assert_eq!(ancestors(&z, &[5, 6, 8], false)?, vec![6, 8]);
        assert_eq!(ancestors(&z, &[5, 6, 8], true)?, vec![5, 6, 8]);
        Ok(())
    }

    #[test]
    fn reachability_linkage_round_trip() -> Result<()> {
        let y = [17.7, 70.0, 97.1, 50.8, 121.6, 79.4, 82.1, 120.9, 77.3, 14.4];
        let z = linkage_from_reachability(&reachability_order(&y)?)?;
        assert_eq!(
            z.to_rows(),
            vec![
                [3., 4., 14.4, 2.],
                [0., 1., 17.7, 2.],
                [5., 6., 50.8, 4.],
                [2., 7., 70.0, 5.],
            ]
        );
        Ok(())
    }

    #[test]
    fn reachability_linkage_heights_with_ties() -> Result<()> {
        let y = [
            2., 9., 3., 5., 18., 7., 13., 4., 4., 4., 3., 9., 8., 3., 5., 1., 10., 9., 12., 11., 3.,
        ];
        let z = linkage_from_reachability(&reachability_order(&y)?)?;
        assert_eq!(z.heights(), seven_point().heights());
        Ok(())
    }

    fn kodama_heights(y: &[f64], n: usize) -> Vec<f64> {
        let mut condensed = y.to_vec();
        let dend = kodama::linkage(&mut condensed, n, kodama::Method::Single);
        let mut h: Vec<f64> = dend.steps().iter().map(|s| s.dissimilarity).collect();
        h.sort_by(f64::total_cmp);
        h
    }

    /// Scores a node by its size, minus a penalty for its height.
    struct Compact;

    impl ClusterScorer for Compact {
        fn node_scores(&self, z: &Dendrogram) -> Result<Vec<f64>> {
            Ok((0..z.n_nodes())
                .map(|v| z.size(v) as f64 - z.height(v))
                .collect())
        }
    }

    fn condensed() -> impl Strategy<Value = (usize, Vec<f64>)> {
        (2usize..16).prop_flat_map(|n| {
            prop::collection::vec(0.0f64..10.0, condensed_len(n)).prop_map(move |y| (n, y))
        })
    }

    proptest! {
        #[test]
        fn heights_match_single_linkage((n, y) in condensed()) {
            let z = linkage_from_reachability(&reachability_order(&y).unwrap()).unwrap();
            prop_assert_eq!(z.n_merges(), n - 1);
            prop_assert_eq!(z.heights(), kodama_heights(&y, n));
        }

        #[test]
        fn pipeline_is_deterministic((n, y) in condensed()) {
            let run = || {
                let partitioner = FlatClusterPartitioner::new(
                    FlatClusterExtractor::new(),
                    Compact,
                    MinStandard::new(vec![1; n]).with_min_pts(2),
                );
                ClusterEngine::new(Precomputed::new(n, y.clone()), partitioner)
                    .make_bins()
                    .unwrap()
            };
            let first = run();
            prop_assert_eq!(first.reach_order.len(), n);
            prop_assert_eq!(first, run());
        }
    }
}
