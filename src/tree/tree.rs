use crate::constants::{MIN_INSTANCES_TO_SPLIT, MIN_PARTITION_SIZE};
use crate::data::DataSet;
use crate::node::TreeNode;
use crate::progress::Progress;
use crate::rule::{inside_rule, inside_rules, PathToNode, Rule};
use crate::splitter::Splitter;
use hashbrown::HashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A binary decision tree stored as an arena of nodes keyed by number, the root is 0.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Tree {
    pub nodes: HashMap<usize, TreeNode>,
    next_num: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

pub const ROOT: usize = 0;

/// A node is worth splitting when it has enough instances and more than one class.
fn should_split(data: &DataSet) -> bool {
    if data.len() < MIN_INSTANCES_TO_SPLIT || data.sum_of_weights() <= 0.0 {
        return false;
    }
    let first = data.instances[0].class_val;
    data.instances.iter().any(|p| p.class_val != first)
}

/// Instances known to fall inside and outside `rule`. Unknown instances reach both
/// children, so each side must also lose the instances resolved to the other one.
fn resolved_sides(data: &DataSet, rule: &Rule) -> (usize, usize) {
    data.instances
        .iter()
        .fold((0, 0), |(i, o), p| match inside_rule(p, rule) {
            Some(true) => (i + 1, o),
            Some(false) => (i, o + 1),
            None => (i, o),
        })
}

impl Tree {
    /// A tree with a single unfinished root.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, TreeNode::new(ROOT, None));
        Tree { nodes, next_num: 1 }
    }

    pub(crate) fn from_nodes(nodes: HashMap<usize, TreeNode>) -> Self {
        let next_num = nodes.keys().max().map_or(0, |m| m + 1);
        Tree { nodes, next_num }
    }

    /// The root node. Trees built by [`Tree::new`] and loaded through `persist` always
    /// have one; `None` only for a hand-assembled arena without node 0.
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.get(&ROOT)
    }

    fn add_node(&mut self, parent: usize) -> usize {
        let num = self.next_num;
        self.next_num += 1;
        self.nodes.insert(num, TreeNode::new(num, Some(parent)));
        num
    }

    /// Grow the tree on `data`, starting over from a single root.
    ///
    /// Each node is split with the rule proposed by `splitter` unless it has fewer than
    /// three instances, holds a single class, gets no rule, or the rule would leave
    /// fewer than two instances on either side. The instances of a child are the ones
    /// reaching it along its path, so instances with missing values follow both branches
    /// with fractional weights. Leaves predict the heaviest class of the training
    /// instances reaching them.
    ///
    /// * `data` - Training instances.
    /// * `splitter` - Strategy proposing the rule of each node.
    /// * `progress` - Passed on to the splitter.
    pub fn fit<T: Splitter>(&mut self, data: &DataSet, splitter: &T, progress: Option<&Progress>) {
        *self = Tree::new();
        let mut growable: Vec<(usize, DataSet)> = vec![(ROOT, data.clone())];

        while let Some((n_idx, node_data)) = growable.pop() {
            let split = if should_split(&node_data) {
                splitter.best_split(&node_data, n_idx, progress)
            } else {
                None
            };

            let children = split.and_then(|s| {
                let (n_inside, n_outside) = resolved_sides(&node_data, &s.rule);
                if n_inside < MIN_PARTITION_SIZE || n_outside < MIN_PARTITION_SIZE {
                    debug!(
                        "Node {} rejects a split resolving {} inside and {} outside of {} instances.",
                        n_idx,
                        n_inside,
                        n_outside,
                        node_data.len()
                    );
                    return None;
                }
                let inside_path = self.path_with(n_idx, &s.rule, false);
                let inside_data = inside_rules(&node_data, &inside_path);
                let outside_path = self.path_with(n_idx, &s.rule, true);
                let outside_data = inside_rules(&node_data, &outside_path);
                Some((s.rule, inside_data, outside_data))
            });

            match children {
                Some((rule, inside_data, outside_data)) => {
                    let inside = self.add_node(n_idx);
                    let outside = self.add_node(n_idx);
                    if let Some(node) = self.nodes.get_mut(&n_idx) {
                        node.rule = Some(rule);
                        node.rule_generated = true;
                        node.inside = Some(inside);
                        node.outside = Some(outside);
                    }
                    growable.push((outside, outside_data));
                    growable.push((inside, inside_data));
                }
                None => {
                    let class_val = if node_data.is_empty() {
                        None
                    } else {
                        self.leaf_class(n_idx, data)
                    };
                    if let Some(node) = self.nodes.get_mut(&n_idx) {
                        node.make_leaf(class_val);
                    }
                }
            }
        }
        info!(
            "Tree grown on {} instances with {} nodes and depth {}.",
            data.len(),
            self.size(),
            self.depth()
        );
    }

    /// Rules from the root down to `num`, each paired with whether `num` lies outside it.
    pub fn rules_for_node(&self, num: usize) -> PathToNode<'_> {
        let mut path = Vec::new();
        let mut current = num;
        while let Some(parent) = self.nodes.get(&current).and_then(|n| n.parent) {
            let Some(p) = self.nodes.get(&parent) else {
                break;
            };
            if let Some(rule) = &p.rule {
                path.push((rule, p.inside != Some(current)));
            }
            current = parent;
        }
        path.reverse();
        path
    }

    /// Path of the would-be child of `num` on one side of `rule`.
    fn path_with<'a>(&'a self, num: usize, rule: &'a Rule, invert: bool) -> PathToNode<'a> {
        let mut path = self.rules_for_node(num);
        path.push((rule, invert));
        path
    }

    /// Heaviest class among the training instances reaching `num`.
    pub fn leaf_class(&self, num: usize, training: &DataSet) -> Option<i64> {
        inside_rules(training, &self.rules_for_node(num))
            .most_frequent()
            .map(|(c, _)| c)
    }

    /// Set the class of every unfinished node.
    pub fn complete_leaves(&mut self, training: &DataSet) {
        let unfinished: Vec<usize> = self
            .nodes
            .values()
            .filter(|n| !n.has_children() && n.class_val.is_none())
            .map(|n| n.num)
            .collect();
        for num in unfinished {
            let class_val = self.leaf_class(num, training);
            if let Some(node) = self.nodes.get_mut(&num) {
                node.class_val = class_val;
            }
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes on the longest path from the root to a leaf.
    pub fn depth(&self) -> usize {
        self.node_depth(ROOT)
    }

    fn node_depth(&self, num: usize) -> usize {
        match self.nodes.get(&num) {
            Some(node) => {
                let inside = node.inside.map_or(0, |n| self.node_depth(n));
                let outside = node.outside.map_or(0, |n| self.node_depth(n));
                inside.max(outside) + 1
            }
            None => 0,
        }
    }

    /// Remove `num` and everything below it.
    pub fn remove_subtree(&mut self, num: usize) {
        if let Some(node) = self.nodes.remove(&num) {
            if let Some(i) = node.inside {
                self.remove_subtree(i);
            }
            if let Some(o) = node.outside {
                self.remove_subtree(o);
            }
        }
    }

    /// Every node is a leaf or has a rule and two children that point back to it.
    pub fn is_well_formed(&self) -> bool {
        self.nodes.values().all(|n| match (n.inside, n.outside) {
            (None, None) => n.rule.is_none(),
            (Some(i), Some(o)) => {
                n.rule.is_some()
                    && self.nodes.get(&i).map_or(false, |c| c.parent == Some(n.num))
                    && self.nodes.get(&o).map_or(false, |c| c.parent == Some(n.num))
            }
            _ => false,
        })
    }

    /// Nested text form, `!(rule)` marks the outside branch.
    pub fn description(&self) -> String {
        self.node_description(ROOT)
    }

    fn node_description(&self, num: usize) -> String {
        let node = match self.nodes.get(&num) {
            Some(n) => n,
            None => return String::new(),
        };
        let (rule, inside, outside) = match (&node.rule, node.inside, node.outside) {
            (Some(r), Some(i), Some(o)) => (r.to_string(), i, o),
            _ => return String::new(),
        };
        let branch = |child: usize, label: String| -> String {
            match self.nodes.get(&child) {
                Some(c) if c.has_children() => {
                    format!("{}\n|\t{}", label, self.node_description(child).replace('\n', "\n|\t"))
                }
                c => {
                    let class = c.and_then(|c| c.class_val).map_or("?".to_string(), |v| v.to_string());
                    format!("{} : {}", label, class)
                }
            }
        };
        format!("{}\n{}", branch(inside, rule.clone()), branch(outside, format!("!({})", rule)))
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<(usize, usize)> = vec![(ROOT, 0)];
        let mut r = String::new();
        while let Some((idx, depth)) = print_buffer.pop() {
            let node = match self.nodes.get(&idx) {
                Some(n) => n,
                None => continue,
            };
            r += format!("{}{}\n", "      ".repeat(depth).as_str(), node).as_str();
            if let Some(o) = node.outside {
                print_buffer.push((o, depth + 1));
            }
            if let Some(i) = node.inside {
                print_buffer.push((i, depth + 1));
            }
        }
        write!(f, "{}", r)
    }
}
