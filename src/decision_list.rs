//! Decision Lists
//!
//! Flattens a tree with axis aligned rules into an ordered list of (ranges, class)
//! entries. An instance takes the class of the first entry whose ranges all hold.
use crate::data::{DataSet, Point};
use crate::errors::ClassifierError;
use crate::rule::{AxisRange, Rule};
use crate::tree::tree::{Tree, ROOT};
use log::warn;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionListEntry {
    pub rules: Vec<AxisRange>,
    pub class_value: i64,
}

impl DecisionListEntry {
    fn matches(&self, point: &Point) -> bool {
        self.rules.iter().all(|r| match point.value(r.axis_index) {
            Some(v) => r.range_min.map_or(true, |m| v >= m) && r.range_max.map_or(true, |m| v <= m),
            None => false,
        })
    }

    /// Intersect ranges on the same attribute. `None` if two of them cannot both hold.
    pub fn simplify(&self) -> Option<DecisionListEntry> {
        let mut merged: Vec<AxisRange> = Vec::with_capacity(self.rules.len());
        for r in self.rules.iter() {
            match merged.iter_mut().find(|m| m.axis_index == r.axis_index) {
                Some(m) => {
                    m.range_min = tighter(m.range_min, r.range_min, f64::max);
                    m.range_max = tighter(m.range_max, r.range_max, f64::min);
                    if let (Some(lo), Some(hi)) = (m.range_min, m.range_max) {
                        if hi < lo {
                            return None;
                        }
                    }
                }
                None => merged.push(r.clone()),
            }
        }
        Some(DecisionListEntry {
            rules: merged,
            class_value: self.class_value,
        })
    }
}

fn tighter(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(pick(x, y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionList {
    pub entries: Vec<DecisionListEntry>,
    /// `(min, max)` of every attribute, used to print open bounds.
    pub attribute_ranges: Vec<(f64, f64)>,
}

impl DecisionList {
    /// Flatten `tree`, inside branches first. Returns `None` if the tree has a rule
    /// that is not axis aligned or a leaf without a class.
    ///
    /// * `tree` - Tree to flatten.
    /// * `data` - Data whose attribute ranges fill open bounds when printing.
    pub fn from_tree(tree: &Tree, data: &DataSet) -> Option<Self> {
        let mut entries = Vec::new();
        // depth first, inside before outside
        let mut stack: Vec<(usize, Vec<AxisRange>)> = vec![(ROOT, Vec::new())];
        while let Some((num, rules)) = stack.pop() {
            let node = tree.nodes.get(&num)?;
            match (&node.rule, node.inside, node.outside) {
                (Some(Rule::Axis(ranges)), Some(inside), Some(outside)) => {
                    let mut inside_rules = rules.clone();
                    inside_rules.extend(ranges.iter().cloned());
                    stack.push((outside, rules));
                    stack.push((inside, inside_rules));
                }
                (Some(_), Some(_), Some(_)) => {
                    warn!("Node {} has a rule that is not axis aligned.", num);
                    return None;
                }
                _ => match node.class_val {
                    Some(class_value) if !node.has_children() => {
                        entries.push(DecisionListEntry { rules, class_value })
                    }
                    _ => {
                        warn!("Node {} is unfinished.", num);
                        return None;
                    }
                },
            }
        }
        let attribute_ranges = data
            .attributes
            .iter()
            .map(|a| a.range().unwrap_or((0.0, 0.0)))
            .collect();
        Some(DecisionList {
            entries,
            attribute_ranges,
        })
    }

    /// Simplify every entry, dropping the ones that can never match.
    pub fn simplify_rules(&mut self) {
        self.entries = self.entries.iter().filter_map(|e| e.simplify()).collect();
    }

    /// Class of the first matching entry.
    pub fn classify(&self, point: &Point) -> Option<i64> {
        self.entries.iter().find(|e| e.matches(point)).map(|e| e.class_value)
    }

    /// One line per entry: the class, then `min max` for every attribute.
    ///
    /// * `precision` - Number of decimals.
    pub fn render(&self, precision: usize) -> String {
        let mut s = String::new();
        for e in self.entries.iter() {
            let _ = write!(s, "{}", e.class_value);
            for (a, (lo, hi)) in self.attribute_ranges.iter().enumerate() {
                let (mut min, mut max) = (*lo, *hi);
                if let Some(r) = e.rules.iter().find(|r| r.axis_index == a) {
                    min = r.range_min.unwrap_or(min);
                    max = r.range_max.unwrap_or(max);
                }
                let _ = write!(s, " {:.*} {:.*}", precision, min, precision, max);
            }
            s.push('\n');
        }
        s
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, precision: usize) -> Result<(), ClassifierError> {
        fs::write(path, self.render(precision)).map_err(|e| ClassifierError::UnableToWrite(e.to_string()))
    }
}
