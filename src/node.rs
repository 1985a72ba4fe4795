use crate::rule::Rule;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A node of a [`Tree`](crate::tree::tree::Tree), addressed by its number in the
/// tree's arena.
///
/// A node is a leaf when it has a class and no children, and internal when it has a
/// rule and both children. A node without a class or children is unfinished, its class
/// is resolved from the training data when needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub num: usize,
    pub parent: Option<usize>,
    /// Child holding the instances inside the rule.
    pub inside: Option<usize>,
    /// Child holding the instances outside the rule.
    pub outside: Option<usize>,
    pub class_val: Option<i64>,
    pub rule: Option<Rule>,
    /// Whether the rule was produced by a split strategy.
    pub rule_generated: bool,
    pub creation_time: String,
}

impl TreeNode {
    pub fn new(num: usize, parent: Option<usize>) -> Self {
        TreeNode {
            num,
            parent,
            inside: None,
            outside: None,
            class_val: None,
            rule: None,
            rule_generated: false,
            creation_time: Utc::now().to_rfc3339(),
        }
    }

    pub fn has_children(&self) -> bool {
        self.inside.is_some() || self.outside.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.class_val.is_some() && !self.has_children()
    }

    /// Turn the node into a leaf predicting `class_val`.
    pub fn make_leaf(&mut self, class_val: Option<i64>) {
        self.inside = None;
        self.outside = None;
        self.rule = None;
        self.class_val = class_val;
    }
}

impl Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.rule, self.has_children()) {
            (Some(rule), true) => write!(
                f,
                "{}:[{}] inside={}, outside={}",
                self.num,
                rule,
                self.inside.map_or("-".to_string(), |n| n.to_string()),
                self.outside.map_or("-".to_string(), |n| n.to_string()),
            ),
            _ => match self.class_val {
                Some(c) => write!(f, "{}:leaf={}", self.num, c),
                None => write!(f, "{}:unfinished", self.num),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::AxisRange;

    #[test]
    fn test_node_states() {
        let mut node = TreeNode::new(0, None);
        assert!(!node.is_leaf());
        assert!(!node.has_children());
        assert_eq!(node.to_string(), "0:unfinished");

        node.rule = Some(Rule::Axis(vec![AxisRange::new(None, Some(0.5), 0)]));
        node.inside = Some(1);
        node.outside = Some(2);
        assert!(node.has_children());
        assert_eq!(node.to_string(), "0:[x0 <= 0.5] inside=1, outside=2");

        node.make_leaf(Some(3));
        assert!(node.is_leaf());
        assert!(node.rule.is_none());
        assert_eq!(node.to_string(), "0:leaf=3");
    }
}
