//! Oblique splits in parallel coordinates.
//!
//! Two attributes are drawn as vertical axes `AXIS_SEPARATION` apart, normalized to
//! [0, 1]. An instance becomes the segment joining its two values, and a candidate rule
//! is the rectangle `[left, top, right, bottom]` the segment has to cross. The searches
//! in `differential_evolution` and `hill_climb` optimize those four parameters for
//! every pair of attributes in parallel.
use crate::constants::{AXIS_SEPARATION, MIN_OBLIQUE_GAIN_RATIO, WARM_START_RIGHT_EDGE, WARM_START_WIDTH};
use crate::data::DataSet;
use crate::info::{gain_ratio, Distribution};
use crate::rule::{inside_pc_region_rule, PcRegionRule, Rectangle, Rule, Shape};
use crate::splitter::axis::find_best_split;
use crate::splitter::SplitInfo;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Mutex;

pub const NUM_PARAMETERS: usize = 4;

/// A pair of attributes, the second one optionally flipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributePair {
    pub attributes: [usize; 2],
    pub flipped: bool,
}

/// Every pair `i < j` of attributes that both have a non degenerate range,
/// with the flipped variant right after the plain one when requested.
pub fn attribute_pairs(data: &DataSet, with_flipped: bool) -> Vec<AttributePair> {
    let usable: Vec<usize> = (0..data.num_attributes())
        .filter(|a| data.attributes[*a].spread().is_some())
        .collect();
    let mut pairs = Vec::new();
    for (k, i) in usable.iter().enumerate() {
        for j in usable[k + 1..].iter() {
            pairs.push(AttributePair {
                attributes: [*i, *j],
                flipped: false,
            });
            if with_flipped {
                pairs.push(AttributePair {
                    attributes: [*i, *j],
                    flipped: true,
                });
            }
        }
    }
    pairs
}

/// The best axis split of each attribute, mapped onto a thin rectangle hugging the
/// left axis: `[0, top, 0.01, bottom]`. Attributes without a split get `None`.
/// Each attribute is searched in parallel on its own copy of the data.
pub fn best_single_splits(data: &DataSet) -> Vec<Option<[f64; NUM_PARAMETERS]>> {
    (0..data.num_attributes())
        .into_par_iter()
        .map(|a| {
            let (min, max) = data.attributes[a].spread()?;
            let split = find_best_split(data, Some(a))?;
            let range = match &split.rule {
                Rule::Axis(ranges) => ranges.first()?.clone(),
                _ => return None,
            };
            let top = range.range_max.map_or(1.0, |m| (m - min) / (max - min));
            let bottom = range.range_min.map_or(0.0, |m| (m - min) / (max - min));
            Some([0.0, top, WARM_START_WIDTH, bottom])
        })
        .collect()
}

/// Evaluates candidate rectangles for one attribute pair.
pub struct ParallelCoordinatesSplit<'a> {
    pub data: &'a DataSet,
    pub pair: AttributePair,
    pub best_single_splits: &'a [Option<[f64; NUM_PARAMETERS]>],
}

impl<'a> ParallelCoordinatesSplit<'a> {
    pub fn new(
        data: &'a DataSet,
        pair: AttributePair,
        best_single_splits: &'a [Option<[f64; NUM_PARAMETERS]>],
    ) -> Self {
        ParallelCoordinatesSplit {
            data,
            pair,
            best_single_splits,
        }
    }

    pub fn constraints(&self) -> Vec<(f64, f64)> {
        vec![(0.0, 1.0); NUM_PARAMETERS]
    }

    /// The rule described by `[left, top, right, bottom]`.
    pub fn rule(&self, parameters: &[f64]) -> PcRegionRule {
        pc_rule(self.data, self.pair, parameters)
    }

    /// `1 / gain ratio` of the rule, infinite when a side is empty or the
    /// gain ratio is negligible.
    pub fn cost(&self, parameters: &[f64]) -> f64 {
        let rule = self.rule(parameters);
        let distribution = Distribution::from_partition(self.data, |p| inside_pc_region_rule(p, &rule));
        if distribution.weight_subset(0) == 0.0 || distribution.weight_subset(1) == 0.0 {
            return f64::INFINITY;
        }
        let g = gain_ratio(&distribution);
        if g < MIN_OBLIQUE_GAIN_RATIO {
            f64::INFINITY
        } else {
            1.0 / g
        }
    }

    /// Warm start from the first attribute's best split, left as is.
    pub fn first_attribute_start(&self) -> Option<[f64; NUM_PARAMETERS]> {
        self.best_single_splits[self.pair.attributes[0]]
    }

    /// Warm start from the second attribute's best split, moved to the right axis
    /// and mirrored when that axis is flipped.
    pub fn second_attribute_start(&self) -> Option<[f64; NUM_PARAMETERS]> {
        let mut start = self.best_single_splits[self.pair.attributes[1]]?;
        start[0] = WARM_START_RIGHT_EDGE;
        start[2] = 1.0;
        if self.pair.flipped {
            start[1] = 1.0 - start[1];
            start[3] = 1.0 - start[3];
        }
        Some(start)
    }
}

pub fn pc_rule(data: &DataSet, pair: AttributePair, parameters: &[f64]) -> PcRegionRule {
    let [a0, a1] = pair.attributes;
    let range = |a: usize| data.attributes[a].range().unwrap_or((0.0, 0.0));
    let (min0, max0) = range(a0);
    let (min1, max1) = range(a1);
    PcRegionRule {
        attributes: pair.attributes,
        region: Shape::Rectangle(Rectangle {
            left: parameters[0],
            right: parameters[2],
            top: parameters[1],
            bottom: parameters[3],
        }),
        axis_separation: AXIS_SEPARATION,
        axis_min: [min0, min1],
        axis_max: [max0, max1],
        attribute_flipped: [false, pair.flipped],
    }
}

#[derive(Debug)]
struct BestCandidate {
    cost: f64,
    index: usize,
    pair: AttributePair,
    parameters: Vec<f64>,
}

/// Run `search` for every pair in parallel and keep the cheapest result.
///
/// `search` gets the pair and a random generator seeded from `seed` and the pair's
/// position, and returns the optimized parameters. Ties go to the earlier pair, so the
/// outcome does not depend on which task finishes first.
pub fn search_pairs<F>(data: &DataSet, pairs: &[AttributePair], seed: u64, search: F) -> Option<SplitInfo>
where
    F: Fn(AttributePair, &mut StdRng) -> (Vec<f64>, f64) + Sync,
{
    let best: Mutex<Option<BestCandidate>> = Mutex::new(None);
    pairs.par_iter().enumerate().for_each(|(index, pair)| {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
        let (parameters, cost) = search(*pair, &mut rng);
        if let Ok(mut b) = best.lock() {
            let better = match b.as_ref() {
                None => cost.is_finite(),
                Some(current) => cost < current.cost || (cost == current.cost && index < current.index),
            };
            if better {
                *b = Some(BestCandidate {
                    cost,
                    index,
                    pair: *pair,
                    parameters,
                });
            }
        }
    });

    let best = best.into_inner().ok().flatten()?;
    if best.cost.is_infinite() {
        return None;
    }
    debug!(
        "Oblique split on attributes {:?} (flipped {}) with cost {:.4}.",
        best.pair.attributes, best.pair.flipped, best.cost
    );
    Some(SplitInfo {
        rule: Rule::PcRegion(vec![pc_rule(data, best.pair, &best.parameters)]),
        gain_ratio: 1.0 / best.cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Point;

    fn diagonal() -> DataSet {
        // Class 0 has x below y, class 1 above, which no single axis split separates.
        let mut data = DataSet::with_attributes(&["x", "y"]);
        let points = [
            (0.1, 0.3, 0),
            (0.4, 0.6, 0),
            (0.7, 0.9, 0),
            (0.2, 0.5, 0),
            (0.3, 0.1, 1),
            (0.6, 0.4, 1),
            (0.9, 0.7, 1),
            (0.5, 0.2, 1),
        ];
        for (x, y, c) in points {
            data.add_point(Point::from_values(&[x, y], c), None).unwrap();
        }
        data
    }

    #[test]
    fn test_attribute_pairs() {
        let mut data = DataSet::with_attributes(&["a", "b", "c"]);
        data.add_point(Point::from_values(&[0.0, 1.0, 5.0], 0), None).unwrap();
        data.add_point(Point::from_values(&[1.0, 1.0, 6.0], 1), None).unwrap();
        // b is constant.
        let pairs = attribute_pairs(&data, false);
        assert_eq!(
            pairs,
            vec![AttributePair {
                attributes: [0, 2],
                flipped: false
            }]
        );
        assert_eq!(attribute_pairs(&data, true).len(), 2);
    }

    #[test]
    fn test_best_single_splits() {
        let data = diagonal();
        let splits = best_single_splits(&data);
        assert_eq!(splits.len(), 2);
        for s in splits.iter().flatten() {
            assert_eq!(s[0], 0.0);
            assert_eq!(s[2], WARM_START_WIDTH);
            assert!((0.0..=1.0).contains(&s[1]) && (0.0..=1.0).contains(&s[3]));
        }
    }

    #[test]
    fn test_cost_of_separating_rectangle() {
        let data = diagonal();
        let singles = best_single_splits(&data);
        let pair = AttributePair {
            attributes: [0, 1],
            flipped: false,
        };
        let split = ParallelCoordinatesSplit::new(&data, pair, &singles);
        // Segments of class 0 rise, class 1 fall, so they cross x = 0.25 at different
        // heights relative to their midpoint. A full height box catches everything.
        assert_eq!(split.cost(&[0.0, 1.0, 1.0, 0.0]), f64::INFINITY);
        // A box near the right axis top catches only high y values.
        let c = split.cost(&[0.95, 1.0, 1.0, 0.55]);
        assert!(c.is_finite() && c >= 1.0);
    }

    #[test]
    fn test_second_attribute_start_is_mirrored() {
        let data = diagonal();
        let singles = vec![Some([0.0, 0.8, 0.01, 0.2]), Some([0.0, 0.7, 0.01, 0.1])];
        let pair = AttributePair {
            attributes: [0, 1],
            flipped: true,
        };
        let split = ParallelCoordinatesSplit::new(&data, pair, &singles);
        let start = split.second_attribute_start().unwrap();
        assert_eq!(start[0], WARM_START_RIGHT_EDGE);
        assert_eq!(start[2], 1.0);
        assert!((start[1] - 0.3).abs() < 1e-12);
        assert!((start[3] - 0.9).abs() < 1e-12);
        assert_eq!(split.first_attribute_start(), singles[0]);
    }

    #[test]
    fn test_search_pairs_keeps_cheapest() {
        let data = diagonal();
        let pairs = vec![
            AttributePair {
                attributes: [0, 1],
                flipped: false,
            },
            AttributePair {
                attributes: [0, 1],
                flipped: true,
            },
        ];
        let result = search_pairs(&data, &pairs, 0, |pair, _rng| {
            let cost = if pair.flipped { 2.0 } else { 4.0 };
            (vec![0.0, 1.0, 0.5, 0.0], cost)
        })
        .unwrap();
        assert_eq!(result.gain_ratio, 0.5);
        match result.rule {
            Rule::PcRegion(rules) => assert_eq!(rules[0].attribute_flipped, [false, true]),
            _ => panic!("expected a parallel coordinates rule"),
        }
        let none = search_pairs(&data, &pairs, 0, |_, _| (vec![0.0; 4], f64::INFINITY));
        assert!(none.is_none());
    }
}
