//! Nested cavities
//!
//! Isolate one class inside a box. The box starts as the bounding box of the class,
//! dimensions that do not cut anything off are dropped, and the remaining ranges are
//! added greedily while they still remove instances of other classes. Which ranges
//! remove what is tracked with bitsets over the other-class instances.
use crate::constants::{CAVITY_RANGE_TOLERANCE, MIN_AXIS_GAIN_RATIO};
use crate::data::DataSet;
use crate::info::{gain_ratio, Distribution};
use crate::progress::Progress;
use crate::rule::{inside_rule, inside_rules, AxisRange, Rule};
use crate::splitter::axis::find_best_split;
use crate::splitter::{SplitInfo, Splitter};
use fixedbitset::FixedBitSet;
use log::debug;

/// Outcome of mining a cavity for one class.
#[derive(Clone, Debug, PartialEq)]
pub struct CavityMining {
    /// The conjunction after boundary correction.
    pub rule: Rule,
    pub class_value: i64,
    /// Other-class instances still inside the full bounding box.
    pub impurity: usize,
    /// Attributes in the order the greedy search added them.
    pub greedy_order: Vec<usize>,
    /// Other-class instances removed by each added range.
    pub reductions: Vec<usize>,
}

/// The bounding box of `class_value`, one range per attribute that actually
/// constrains the data. `None` when no attribute does.
pub fn find_all_rules(class_value: i64, data: &DataSet) -> Option<Vec<AxisRange>> {
    let mut ranges: Vec<Option<(f64, f64)>> = vec![None; data.num_attributes()];
    for p in data.instances.iter().filter(|p| p.class_val == class_value) {
        for (r, v) in ranges.iter_mut().zip(p.values.iter()) {
            if let Some(v) = v {
                *r = Some(match r {
                    Some((min, max)) => (min.min(*v), max.max(*v)),
                    None => (*v, *v),
                });
            }
        }
    }

    let rules: Vec<AxisRange> = ranges
        .into_iter()
        .enumerate()
        .filter_map(|(a, r)| {
            let (min, max) = r?;
            if let Some((att_min, att_max)) = data.attributes[a].range() {
                let tolerance = (att_max - att_min) * CAVITY_RANGE_TOLERANCE;
                if att_min == att_max || ((min - att_min).abs() < tolerance && (max - att_max).abs() < tolerance) {
                    return None;
                }
            }
            Some(AxisRange::new(Some(min), Some(max), a))
        })
        .collect();

    if rules.is_empty() {
        None
    } else {
        Some(rules)
    }
}

/// Bit `k` is set when the kth other-class instance is not excluded by `range`.
pub fn impurity_bits(data: &DataSet, others: &[usize], range: &AxisRange) -> FixedBitSet {
    let rule = Rule::Axis(vec![range.clone()]);
    let mut bits = FixedBitSet::with_capacity(others.len());
    for (k, i) in others.iter().enumerate() {
        if inside_rule(&data.instances[*i], &rule) != Some(false) {
            bits.insert(k);
        }
    }
    bits
}

/// Weight of other-class instances inside `rule`.
pub fn impurity(data: &DataSet, rule: &Rule, class_value: i64) -> f64 {
    let inside = inside_rules(data, &[(rule, false)]);
    inside
        .instances
        .iter()
        .enumerate()
        .filter(|(_, p)| p.class_val != class_value)
        .map(|(i, _)| inside.weight(i))
        .sum()
}

/// Greedily pick ranges until the conjunction removes as many other-class instances
/// as the full box. Returns the chosen positions in `bits`, the reduction of each
/// step, and the impurity of the full box.
pub fn greedy_cover(bits: &[FixedBitSet], num_others: usize) -> (Vec<usize>, Vec<usize>, usize) {
    let mut full = FixedBitSet::with_capacity(num_others);
    full.insert_range(..);
    let mut current = full.clone();
    for b in bits {
        full.intersect_with(b);
    }
    let target = full.count_ones(..);

    let mut remaining: Vec<usize> = (0..bits.len()).collect();
    let mut order = Vec::new();
    let mut reductions = Vec::new();
    let mut current_count = current.count_ones(..);
    while !remaining.is_empty() && current_count != target {
        let mut best: Option<(usize, usize, FixedBitSet)> = None;
        for (k, r) in remaining.iter().enumerate() {
            let mut next = current.clone();
            next.intersect_with(&bits[*r]);
            let reduction = current_count - next.count_ones(..);
            if best.as_ref().map_or(true, |(_, br, _)| reduction > *br) {
                best = Some((k, reduction, next));
            }
        }
        let Some((k, reduction, next)) = best else {
            break;
        };
        order.push(remaining.remove(k));
        reductions.push(reduction);
        current = next;
        current_count = current.count_ones(..);
    }
    (order, reductions, target)
}

/// Move each bound half way towards the nearest value outside of it. A bound with
/// nothing beyond it is opened, and a range with both bounds open is dropped.
pub fn correct_decision_boundaries(ranges: &[AxisRange], data: &DataSet) -> Vec<AxisRange> {
    let mut result = Vec::new();
    for r in ranges {
        let mut values: Vec<f64> = data.instances.iter().filter_map(|p| p.values[r.axis_index]).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let new_min = r.range_min.and_then(|min| {
            let k = values.partition_point(|v| *v < min);
            if k > 0 && k < values.len() {
                let v = values[k - 1];
                Some(v + (min - v) / 2.0)
            } else {
                None
            }
        });
        let new_max = r.range_max.and_then(|max| {
            let k = values.partition_point(|v| *v <= max);
            if k > 0 && k < values.len() {
                let v = values[k];
                Some(max + (v - max) / 2.0)
            } else {
                None
            }
        });
        if new_min.is_some() || new_max.is_some() {
            result.push(AxisRange::new(new_min, new_max, r.axis_index));
        }
    }
    result
}

/// Mine the cavity isolating `class_value`.
pub fn find_next_cavity(class_value: i64, data: &DataSet) -> Option<CavityMining> {
    let all_rules = find_all_rules(class_value, data)?;
    let others: Vec<usize> = (0..data.len())
        .filter(|i| data.instances[*i].class_val != class_value)
        .collect();
    let bits: Vec<FixedBitSet> = all_rules.iter().map(|r| impurity_bits(data, &others, r)).collect();
    let (order, reductions, target) = greedy_cover(&bits, others.len());

    // Without other classes there is nothing to cut, keep the whole box.
    let chosen: Vec<AxisRange> = if order.is_empty() {
        all_rules.clone()
    } else {
        order.iter().map(|k| all_rules[*k].clone()).collect()
    };
    let corrected = correct_decision_boundaries(&chosen, data);
    if corrected.is_empty() {
        return None;
    }
    debug!(
        "Cavity for class {} uses {} of {} ranges, {} other instances left inside.",
        class_value,
        corrected.len(),
        all_rules.len(),
        target
    );
    Some(CavityMining {
        rule: Rule::Axis(corrected),
        class_value,
        impurity: target,
        greedy_order: order.iter().map(|k| all_rules[*k].axis_index).collect(),
        reductions,
    })
}

/// Mine the cavity of the class whose bounding box holds the least weight of other
/// classes, considering classes with a weight of at least 2.
pub fn find_best_cavity(data: &DataSet) -> Option<CavityMining> {
    let dist = data.distribution();
    let mut best: Option<(i64, f64)> = None;
    for (ci, c) in data.classes.iter().enumerate() {
        if dist.get(ci).map_or(true, |w| *w < 2.0) {
            continue;
        }
        if let Some(all_rules) = find_all_rules(c.value, data) {
            let num_other = impurity(data, &Rule::Axis(all_rules), c.value);
            if best.map_or(true, |(_, b)| b > num_other) {
                best = Some((c.value, num_other));
            }
        }
    }
    let (class_value, _) = best?;
    find_next_cavity(class_value, data)
}

/// The split a cavity rule makes on `data`, `None` if no instance is known to be inside
/// or the gain ratio is too small to be worth a node.
fn cavity_split(data: &DataSet, rule: Rule) -> Option<SplitInfo> {
    let dist = Distribution::from_partition(data, |p| inside_rule(p, &rule));
    if dist.weight_subset(0) <= 0.0 {
        debug!("Cavity rule resolves no instance inside.");
        return None;
    }
    let gain_ratio = gain_ratio(&dist);
    if gain_ratio < MIN_AXIS_GAIN_RATIO {
        debug!("Cavity rule rejected with gain ratio {}.", gain_ratio);
        return None;
    }
    Some(SplitInfo { rule, gain_ratio })
}

/// Both the axis search and the cavity, whichever has the higher gain ratio.
/// The axis split wins ties.
pub fn find_best_cavity_c45(data: &DataSet) -> Option<SplitInfo> {
    let axis = find_best_split(data, None);
    let cavity = find_best_cavity(data).and_then(|m| cavity_split(data, m.rule));
    match (axis, cavity) {
        (Some(a), Some(c)) => {
            if c.gain_ratio > a.gain_ratio {
                Some(c)
            } else {
                Some(a)
            }
        }
        (a, c) => a.or(c),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CavitySplitter;

impl Splitter for CavitySplitter {
    fn best_split(&self, data: &DataSet, _node: usize, _progress: Option<&Progress>) -> Option<SplitInfo> {
        cavity_split(data, find_best_cavity(data)?.rule)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CavityC45Splitter;

impl Splitter for CavityC45Splitter {
    fn best_split(&self, data: &DataSet, _node: usize, _progress: Option<&Progress>) -> Option<SplitInfo> {
        find_best_cavity_c45(data)
    }
}
