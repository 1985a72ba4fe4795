pub mod predict;
pub mod tree;

// Unit-testing
#[cfg(test)]
mod tests {
    use crate::data::{DataSet, Point};
    use crate::optimizer::{DifferentialEvolutionParams, HillClimbMode, HillClimbParams};
    use crate::progress::Progress;
    use crate::rule::{AxisRange, Rule};
    use crate::splitter::{SplitInfo, Splitter};
    use crate::splitter::{AxisSplitter, CavitySplitter, DifferentialEvolutionSplitter, HillClimbSplitter};
    use crate::tree::tree::{Tree, ROOT};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn four_points() -> DataSet {
        let mut data = DataSet::with_attributes(&["x"]);
        for (v, c) in [(0.1, 0), (0.2, 0), (0.3, 1), (0.4, 1)] {
            data.add_point(Point::from_values(&[v], c), None).unwrap();
        }
        data
    }

    /// Three classes in two noisy attributes, with some missing values.
    fn blobs(n: usize, seed: u64) -> DataSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = DataSet::with_attributes(&["x", "y"]);
        let centers = [(0.2, 0.2), (0.8, 0.3), (0.5, 0.8)];
        for i in 0..n {
            let c = i % 3;
            let (cx, cy) = centers[c];
            let mut values = vec![
                Some(cx + rng.gen_range(-0.15..0.15)),
                Some(cy + rng.gen_range(-0.15..0.15)),
            ];
            if rng.gen_bool(0.05) {
                values[rng.gen_range(0..2)] = None;
            }
            data.add_point(Point::new(values, c as i64), None).unwrap();
        }
        data
    }

    #[test]
    fn test_tree_fit_four_points() {
        let data = four_points();
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        println!("{}", tree);
        assert_eq!(tree.size(), 3);
        assert_eq!(tree.depth(), 2);
        assert!(tree.is_well_formed());
        let root = tree.root().unwrap();
        assert!(root.rule_generated);
        let inside = &tree.nodes[&root.inside.unwrap()];
        let outside = &tree.nodes[&root.outside.unwrap()];
        assert!(inside.is_leaf() && outside.is_leaf());
        assert_eq!(inside.class_val, Some(0));
        assert_eq!(outside.class_val, Some(1));
        for p in data.instances.iter() {
            assert_eq!(tree.predict_point(p, &data), Some(p.class_val));
        }
        assert_eq!(tree.description(), "x0 <= 0.25 : 0\n!(x0 <= 0.25) : 1");
    }

    #[test]
    fn test_tree_fit_single_class_is_leaf() {
        let mut data = DataSet::with_attributes(&["x"]);
        for v in [0.1, 0.2, 0.3] {
            data.add_point(Point::from_values(&[v], 5), None).unwrap();
        }
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.root().unwrap().class_val, Some(5));
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.description(), "");
    }

    #[test]
    fn test_tree_well_formed_for_every_strategy() {
        let data = blobs(60, 0);
        let de = DifferentialEvolutionSplitter::new(
            DifferentialEvolutionParams {
                iterations: 10,
                population_size: 10,
                ..Default::default()
            },
            true,
            0,
        );
        let hc = HillClimbSplitter::new(HillClimbParams::default(), HillClimbMode::FirstImprovement, 0);

        let mut trees = Vec::new();
        let mut t = Tree::new();
        t.fit(&data, &AxisSplitter, None);
        trees.push(t);
        let mut t = Tree::new();
        t.fit(&data, &de, None);
        trees.push(t);
        let mut t = Tree::new();
        t.fit(&data, &hc, None);
        trees.push(t);
        let mut t = Tree::new();
        t.fit(&data, &CavitySplitter, None);
        trees.push(t);

        for tree in trees.iter() {
            assert!(tree.is_well_formed());
            assert!(tree.size() >= 3);
            assert_eq!(tree.size() % 2, 1);
            for node in tree.nodes.values() {
                if !node.has_children() {
                    assert!(node.class_val.is_some());
                }
            }
        }
    }

    #[test]
    fn test_axis_tree_fits_training_data() {
        let data = blobs(90, 1);
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        let predictions = tree.predict(&data, &data);
        let correct = predictions
            .iter()
            .zip(data.instances.iter())
            .filter(|(p, i)| **p == Some(i.class_val))
            .count();
        assert!(correct as f64 / data.len() as f64 > 0.9);
    }

    #[test]
    fn test_missing_value_follows_both_branches() {
        let data = four_points();
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        let p = tree.predict_proba(&Point::new(vec![None], 0), &data);
        assert_eq!(p.len(), 2);
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
        // Equal probabilities go to the first class seen.
        assert_eq!(tree.predict_point(&Point::new(vec![None], 0), &data), Some(0));
    }

    #[test]
    fn test_missing_value_weighted_by_branch_share() {
        let mut data = DataSet::with_attributes(&["x"]);
        for (v, c) in [(0.1, 0), (0.2, 0), (0.25, 0), (0.3, 1), (0.4, 1)] {
            data.add_point(Point::from_values(&[v], c), None).unwrap();
        }
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        assert_eq!(tree.size(), 3);
        let p = tree.predict_proba(&Point::new(vec![None], 1), &data);
        assert!((p[0] - 0.6).abs() < 1e-12);
        assert!((p[1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_complete_leaves() {
        let data = four_points();
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        let inside = tree.root().unwrap().inside.unwrap();
        if let Some(n) = tree.nodes.get_mut(&inside) {
            n.class_val = None;
        }
        // Unfinished leaves are resolved on the fly.
        assert_eq!(tree.predict_point(&data.instances[0], &data), Some(0));
        tree.complete_leaves(&data);
        assert_eq!(tree.nodes[&inside].class_val, Some(0));
    }

    #[test]
    fn test_rules_for_node() {
        let data = blobs(60, 2);
        let mut tree = Tree::new();
        tree.fit(&data, &AxisSplitter, None);
        assert!(tree.rules_for_node(ROOT).is_empty());
        let root = tree.root().unwrap();
        let outside = root.outside.unwrap();
        let path = tree.rules_for_node(outside);
        assert_eq!(path.len(), 1);
        assert!(path[0].1);
        assert_eq!(Some(path[0].0), root.rule.as_ref());
    }

    #[test]
    fn test_tree_without_root() {
        let tree = Tree::from_nodes(hashbrown::HashMap::new());
        assert!(tree.root().is_none());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.description(), "");
        assert!(tree.rules_for_node(ROOT).is_empty());
        let doc = crate::persist::NodeDocument::from_tree(&tree);
        assert_eq!(doc.class_val, None);
        assert!(doc.inside_child_rule.is_none());
    }

    /// Always proposes `x0 <= 0.3`.
    struct FixedRule;

    impl Splitter for FixedRule {
        fn best_split(&self, _data: &DataSet, _node: usize, _progress: Option<&Progress>) -> Option<SplitInfo> {
            Some(SplitInfo {
                rule: Rule::Axis(vec![AxisRange::new(None, Some(0.3), 0)]),
                gain_ratio: 1.0,
            })
        }
    }

    #[test]
    fn test_split_needs_resolved_instances_on_both_sides() {
        // Only one known value falls inside, the unknown ones would reach both children.
        let mut data = DataSet::with_attributes(&["x"]);
        for (v, c) in [(None, 0), (None, 0), (Some(0.1), 0), (Some(0.5), 1), (Some(0.6), 1), (Some(0.7), 1)] {
            data.add_point(Point::new(vec![v], c), None).unwrap();
        }
        let mut tree = Tree::new();
        tree.fit(&data, &FixedRule, None);
        assert!(tree.is_well_formed());
        assert_eq!(tree.size(), 1);

        // With two known values inside the split is made, and growth stops below it.
        data.add_point(Point::from_values(&[0.2], 0), None).unwrap();
        tree.fit(&data, &FixedRule, None);
        assert!(tree.is_well_formed());
        assert_eq!(tree.size(), 3);
    }
}
