use crate::constants::{PRUNE_CONFIDENCE, PRUNE_SLACK, PRUNE_Z};
use crate::data::DataSet;
use crate::rule::inside_rules;
use crate::tree::tree::{Tree, ROOT};
use log::info;

/// Upper confidence bound on the number of errors of a leaf that misclassifies
/// `e` of the `n` instances reaching it.
pub fn error_estimate(e: f64, n: f64) -> f64 {
    if e < 1.0 {
        return n * (1.0 - PRUNE_CONFIDENCE.powf(1.0 / n));
    }
    if e >= n {
        return 0.0;
    }
    let z = PRUNE_Z;
    let f = (e + 0.5) / n;
    let mut error = f + (z * z) / (2.0 * n);
    let mut s = f / n - f * f / n;
    s += (z * z) / (4.0 * n * n);
    error += z * s.sqrt();
    error /= 1.0 + z * z / n;
    error * n
}

/// Estimated errors if `data` were all predicted as `class_val`, or as its heaviest
/// class when `None`.
fn leaf_error(data: &DataSet, class_val: Option<i64>) -> f64 {
    let total = data.sum_of_weights();
    let dist = data.distribution();
    let correct = match class_val {
        Some(c) => data.class_index(c).map_or(0.0, |ci| dist[ci]),
        None => dist.iter().cloned().fold(0.0, f64::max),
    };
    error_estimate(total - correct, total)
}

impl Tree {
    /// Pessimistic error pruning with subtree raising, bottom up.
    ///
    /// At every internal node three estimates are compared: the node as a leaf, the
    /// pruned subtree, and the subtree of the heavier child grafted in place of the
    /// node. The leaf is preferred, then the graft, each with a small slack.
    ///
    /// Returns the estimated errors of the pruned tree on `data`.
    pub fn prune(&mut self, data: &DataSet) -> f64 {
        let old_size = self.size();
        let error = self.prune_node(ROOT, data);
        info!(
            "Pruned tree from {} to {} nodes, estimated errors {:.4}.",
            old_size,
            self.size(),
            error
        );
        error
    }

    fn prune_node(&mut self, num: usize, data: &DataSet) -> f64 {
        let (rule, inside, outside) = match self.nodes.get(&num) {
            Some(node) => match (&node.rule, node.inside, node.outside) {
                (Some(r), Some(i), Some(o)) => (r.clone(), i, o),
                _ => return leaf_error(data, None),
            },
            None => return 0.0,
        };

        let leaf = data.most_frequent();
        let leaf_err = leaf_error(data, None);

        let inside_data = inside_rules(data, &[(&rule, false)]);
        let outside_data = inside_rules(data, &[(&rule, true)]);
        let e1 = self.prune_node(inside, &inside_data);
        let e2 = self.prune_node(outside, &outside_data);
        let tree_err = e1 + e2;

        let heavier = if inside_data.sum_of_weights() >= outside_data.sum_of_weights() {
            inside
        } else {
            outside
        };
        let graft_err = self.subtree_error(heavier, data);

        if leaf_err <= tree_err + PRUNE_SLACK && leaf_err <= graft_err + PRUNE_SLACK {
            self.collapse(num, leaf.map(|(c, _)| c));
            leaf_err
        } else if graft_err <= tree_err + PRUNE_SLACK {
            self.graft(num, heavier);
            graft_err
        } else {
            tree_err
        }
    }

    /// Estimated errors of the subtree under `num` on `data`, without changing it.
    pub fn subtree_error(&self, num: usize, data: &DataSet) -> f64 {
        let node = match self.nodes.get(&num) {
            Some(n) => n,
            None => return 0.0,
        };
        match (&node.rule, node.inside, node.outside) {
            (Some(rule), Some(i), Some(o)) => {
                self.subtree_error(i, &inside_rules(data, &[(rule, false)]))
                    + self.subtree_error(o, &inside_rules(data, &[(rule, true)]))
            }
            _ => leaf_error(data, node.class_val),
        }
    }

    fn collapse(&mut self, num: usize, class_val: Option<i64>) {
        let children: Vec<usize> = match self.nodes.get(&num) {
            Some(node) => node.inside.iter().chain(node.outside.iter()).copied().collect(),
            None => return,
        };
        for c in children {
            self.remove_subtree(c);
        }
        if let Some(node) = self.nodes.get_mut(&num) {
            node.make_leaf(class_val);
        }
    }

    /// Replace `num` by its child `child`, dropping the other child.
    fn graft(&mut self, num: usize, child: usize) {
        let other = match self.nodes.get(&num) {
            Some(n) if n.inside == Some(child) => n.outside,
            Some(n) => n.inside,
            None => return,
        };
        if let Some(o) = other {
            self.remove_subtree(o);
        }
        let Some(replacement) = self.nodes.remove(&child) else {
            return;
        };
        for grandchild in replacement.inside.iter().chain(replacement.outside.iter()) {
            if let Some(g) = self.nodes.get_mut(grandchild) {
                g.parent = Some(num);
            }
        }
        if let Some(node) = self.nodes.get_mut(&num) {
            node.inside = replacement.inside;
            node.outside = replacement.outside;
            node.rule = replacement.rule;
            node.class_val = replacement.class_val;
            node.rule_generated = replacement.rule_generated;
        }
    }
}
