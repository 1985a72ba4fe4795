use crate::constants::{
    AVERAGE_GAIN_SLACK, MIN_AXIS_GAIN_RATIO, MIN_SPLIT_CEILING, MIN_SPLIT_FLOOR, MIN_SPLIT_FRACTION, TIE_TOLERANCE,
};
use crate::data::DataSet;
use crate::info::FreqTable;
use crate::progress::Progress;
use crate::rule::{AxisRange, Rule};
use crate::splitter::{SplitInfo, Splitter};
use log::debug;

/// C4.5 style search for the best single attribute range.
#[derive(Clone, Copy, Debug, Default)]
pub struct AxisSplitter;

impl Splitter for AxisSplitter {
    fn best_split(&self, data: &DataSet, _node: usize, _progress: Option<&Progress>) -> Option<SplitInfo> {
        find_best_split(data, None)
    }
}

/// Best usable range of one attribute.
struct AttributeSplit {
    attribute: usize,
    gain: f64,
    gain_ratio: f64,
    range_min: Option<f64>,
    range_max: Option<f64>,
}

/// Smallest weight either side of a split must have.
fn min_split(known: usize, num_classes: usize) -> f64 {
    let raw = MIN_SPLIT_FRACTION * known as f64 / num_classes.max(1) as f64;
    raw.clamp(MIN_SPLIT_FLOOR, MIN_SPLIT_CEILING)
}

/// Scan every range `[values[i], values[j]]` of a dataset sorted on `a`.
/// Ties are skipped so that a range never cuts a run of equal values.
fn best_range(data: &DataSet, a: usize, num_missing: usize) -> Option<AttributeSplit> {
    let n = data.len();
    let known = n - num_missing;
    let table = FreqTable::new(data, num_missing);
    let floor = min_split(known, data.num_classes());
    let value = |i: usize| data.instances[i].values[a];

    let mut best: Option<(usize, usize, f64)> = None;
    let mut last_min: Option<f64> = None;
    for i in 0..known.saturating_sub(1) {
        let min_val = value(i)?;
        if last_min.map_or(false, |l| (min_val - l).abs() < TIE_TOLERANCE) {
            continue;
        }
        last_min = Some(min_val);

        for j in (i + 1)..known {
            let Some(max_val) = value(j) else {
                continue;
            };
            if j + 1 < known && value(j + 1).map_or(false, |next| next - max_val < TIE_TOLERANCE) {
                continue;
            }
            let weights = table.split_distribution(i, j);
            if weights.inside < floor || weights.outside < floor {
                continue;
            }
            let g = table.gain(i, j);
            if best.map_or(true, |(_, _, bg)| g > bg) {
                best = Some((i, j, g));
            }
        }
    }

    let (i, j, gain) = best?;
    let gain_ratio = table.gain_ratio(i, j);

    // Place the bounds half way to the neighbouring values.
    let mut min_val = value(i)?;
    let mut max_val = value(j)?;
    if i != 0 {
        if let Some(prev) = value(i - 1) {
            min_val -= (min_val - prev) / 2.0;
        }
    }
    if j + 1 < known {
        if let Some(next) = value(j + 1) {
            max_val += (next - max_val) / 2.0;
        }
    }
    let lowest = value(0)?;
    let highest = value(known - 1)?;
    Some(AttributeSplit {
        attribute: a,
        gain,
        gain_ratio,
        range_min: if min_val > lowest { Some(min_val) } else { None },
        range_max: if max_val < highest { Some(max_val) } else { None },
    })
}

/// Find the best axis aligned range split.
///
/// Every attribute contributes its best usable range by gain. Among attributes whose
/// gain is not far below the average, the one with the highest gain ratio wins.
///
/// * `data` - Instances to split, left untouched, the search sorts a private copy.
/// * `attribute` - Restrict the search to a single attribute.
pub fn find_best_split(data: &DataSet, attribute: Option<usize>) -> Option<SplitInfo> {
    if data.is_empty() {
        return None;
    }
    let attributes = match attribute {
        Some(a) => a..(a + 1),
        None => 0..data.num_attributes(),
    };
    let mut sorted = data.clone();
    let mut candidates: Vec<AttributeSplit> = Vec::new();
    for a in attributes {
        let num_missing = sorted.sort_on_attribute(a);
        if num_missing == sorted.len() {
            continue;
        }
        if let Some(split) = best_range(&sorted, a, num_missing) {
            candidates.push(split);
        }
    }
    if candidates.is_empty() {
        return None;
    }

    let average = candidates.iter().map(|c| c.gain).sum::<f64>() / candidates.len() as f64;
    let mut best: Option<&AttributeSplit> = None;
    for c in candidates.iter().filter(|c| c.gain >= average - AVERAGE_GAIN_SLACK) {
        if best.map_or(true, |b| c.gain_ratio > b.gain_ratio) {
            best = Some(c);
        }
    }
    let best = best?;
    if best.gain_ratio < MIN_AXIS_GAIN_RATIO {
        return None;
    }
    debug!(
        "Axis split on attribute {} with gain ratio {:.4}.",
        best.attribute, best.gain_ratio
    );
    Some(SplitInfo {
        rule: Rule::Axis(vec![AxisRange::new(best.range_min, best.range_max, best.attribute)]),
        gain_ratio: best.gain_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Point;

    fn four_points() -> DataSet {
        let mut data = DataSet::with_attributes(&["x"]);
        for (v, c) in [(0.1, 0), (0.2, 0), (0.3, 1), (0.4, 1)] {
            data.add_point(Point::from_values(&[v], c), None).unwrap();
        }
        data
    }

    #[test]
    fn test_split_at_midpoint() {
        let data = four_points();
        let split = find_best_split(&data, None).unwrap();
        assert!((split.gain_ratio - 1.0).abs() < 1e-12);
        match split.rule {
            Rule::Axis(ranges) => {
                assert_eq!(ranges.len(), 1);
                assert_eq!(ranges[0].axis_index, 0);
                assert_eq!(ranges[0].range_min, None);
                assert!((ranges[0].range_max.unwrap() - 0.25).abs() < 1e-12);
            }
            _ => panic!("expected an axis rule"),
        }
    }

    #[test]
    fn test_input_order_is_kept() {
        let mut data = DataSet::with_attributes(&["x"]);
        for (v, c) in [(0.4, 1), (0.1, 0), (0.3, 1), (0.2, 0)] {
            data.add_point(Point::from_values(&[v], c), None).unwrap();
        }
        let before: Vec<Point> = data.instances.clone();
        assert!(find_best_split(&data, None).is_some());
        assert_eq!(data.instances, before);
    }

    #[test]
    fn test_no_split_for_pure_or_tiny_data() {
        let mut pure = DataSet::with_attributes(&["x"]);
        for v in [0.1, 0.2, 0.3, 0.4] {
            pure.add_point(Point::from_values(&[v], 0), None).unwrap();
        }
        assert!(find_best_split(&pure, None).is_none());

        let mut tiny = DataSet::with_attributes(&["x"]);
        tiny.add_point(Point::from_values(&[0.1], 0), None).unwrap();
        tiny.add_point(Point::from_values(&[0.2], 1), None).unwrap();
        assert!(find_best_split(&tiny, None).is_none());
        assert!(find_best_split(&DataSet::with_attributes(&["x"]), None).is_none());
    }

    #[test]
    fn test_ties_are_not_cut() {
        let mut data = DataSet::with_attributes(&["x"]);
        for (v, c) in [(1.0, 0), (1.0, 0), (1.0, 1), (2.0, 1), (2.0, 1), (2.0, 1)] {
            data.add_point(Point::from_values(&[v], c), None).unwrap();
        }
        let split = find_best_split(&data, None).unwrap();
        match split.rule {
            Rule::Axis(ranges) => assert!((ranges[0].range_max.unwrap() - 1.5).abs() < 1e-12),
            _ => panic!("expected an axis rule"),
        }
    }

    #[test]
    fn test_picks_informative_attribute() {
        let mut data = DataSet::with_attributes(&["noise", "signal"]);
        let noise = [0.5, 0.1, 0.9, 0.3, 0.7, 0.2, 0.8, 0.4];
        for (i, n) in noise.iter().enumerate() {
            let c = if i < 4 { 0 } else { 1 };
            data.add_point(Point::from_values(&[*n, i as f64], c), None).unwrap();
        }
        let split = find_best_split(&data, None).unwrap();
        match split.rule {
            Rule::Axis(ranges) => {
                assert_eq!(ranges[0].axis_index, 1);
                assert!((ranges[0].range_max.unwrap() - 3.5).abs() < 1e-12);
            }
            _ => panic!("expected an axis rule"),
        }
        // Restricting to the noisy attribute gives a weaker split.
        let restricted = find_best_split(&data, Some(0));
        assert!(restricted.map_or(true, |s| s.gain_ratio < split.gain_ratio));
    }

    #[test]
    fn test_missing_values_dilute_the_split() {
        let mut data = four_points();
        data.add_point(Point::new(vec![None], 0), None).unwrap();
        let split = find_best_split(&data, None).unwrap();
        assert!(split.gain_ratio < 1.0);
        assert!(split.gain_ratio > 0.0);
    }

    #[test]
    fn test_min_split() {
        assert_eq!(min_split(4, 2), 2.0);
        assert_eq!(min_split(1000, 2), 25.0);
        assert!((min_split(300, 2) - 15.0).abs() < 1e-12);
    }
}
