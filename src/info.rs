//! Information
//!
//! Entropy, gain and gain ratio, computed either from an explicit [`Distribution`]
//! or, for the axis search, from a cumulative [`FreqTable`] over sorted instances.
use crate::data::{DataSet, Point};
use crate::utils::xlog2x;
use std::cell::Cell;

/// Class weights per candidate partition, plus the weight of instances that could not
/// be assigned to any partition.
#[derive(Clone, Debug)]
pub struct Distribution {
    /// `subsets[s][c]` is the weight of class `c` in partition `s`.
    pub subsets: Vec<Vec<f64>>,
    pub num_missing: f64,
    cached_total_weight: Cell<Option<f64>>,
    cached_subset_weight: Vec<Cell<Option<f64>>>,
    cached_default_info: Cell<Option<f64>>,
}

impl Distribution {
    pub fn new(num_subsets: usize, num_classes: usize) -> Self {
        Distribution {
            subsets: vec![vec![0.0; num_classes]; num_subsets],
            num_missing: 0.0,
            cached_total_weight: Cell::new(None),
            cached_subset_weight: (0..num_subsets).map(|_| Cell::new(None)).collect(),
            cached_default_info: Cell::new(None),
        }
    }

    /// Build a two way distribution by assigning every instance with `assign`,
    /// `Some(true)` is the first partition, `Some(false)` the second and `None` missing.
    pub fn from_partition<F>(data: &DataSet, assign: F) -> Self
    where
        F: Fn(&Point) -> Option<bool>,
    {
        let mut dist = Distribution::new(2, data.num_classes());
        for (i, p) in data.instances.iter().enumerate() {
            let w = data.weight(i);
            match assign(p) {
                Some(true) => dist.subsets[0][p.class_index] += w,
                Some(false) => dist.subsets[1][p.class_index] += w,
                None => dist.num_missing += w,
            }
        }
        dist.invalidate_cache();
        dist
    }

    /// Must be called after `subsets` or `num_missing` are changed directly.
    pub fn invalidate_cache(&mut self) {
        self.cached_total_weight.set(None);
        self.cached_default_info.set(None);
        self.cached_subset_weight = (0..self.subsets.len()).map(|_| Cell::new(None)).collect();
    }

    pub fn weight_subset(&self, s: usize) -> f64 {
        if let Some(w) = self.cached_subset_weight[s].get() {
            return w;
        }
        let w = self.subsets[s].iter().sum();
        self.cached_subset_weight[s].set(Some(w));
        w
    }

    /// Weight over all partitions, missing included.
    pub fn total_weight(&self) -> f64 {
        if let Some(w) = self.cached_total_weight.get() {
            return w;
        }
        let w = (0..self.subsets.len()).map(|s| self.weight_subset(s)).sum::<f64>() + self.num_missing;
        self.cached_total_weight.set(Some(w));
        w
    }

    /// Entropy of the known instances before splitting.
    pub fn default_info(&self) -> f64 {
        if let Some(i) = self.cached_default_info.get() {
            return i;
        }
        let i = info(self, None);
        self.cached_default_info.set(Some(i));
        i
    }
}

/// Entropy in bits of one partition, or of all known instances when `subset` is `None`.
pub fn info(distribution: &Distribution, subset: Option<usize>) -> f64 {
    let mut info = 0.0;
    match subset {
        Some(s) => {
            let w = distribution.weight_subset(s);
            if w <= 0.0 {
                return 0.0;
            }
            for c in distribution.subsets[s].iter() {
                info += xlog2x(c / w);
            }
        }
        None => {
            if distribution.subsets.is_empty() {
                return 0.0;
            }
            let known = distribution.total_weight() - distribution.num_missing;
            if known <= 0.0 {
                return 0.0;
            }
            for c in 0..distribution.subsets[0].len() {
                let f: f64 = distribution.subsets.iter().map(|s| s[c]).sum();
                info += xlog2x(f / known);
            }
        }
    }
    -info
}

/// Information gain of the partitions, diluted by the fraction of missing weight.
pub fn gain(distribution: &Distribution) -> f64 {
    let total = distribution.total_weight();
    let known = total - distribution.num_missing;
    if known <= 0.0 {
        return 0.0;
    }
    let infox: f64 = (0..distribution.subsets.len())
        .map(|s| (distribution.weight_subset(s) / known) * info(distribution, Some(s)))
        .sum();
    (known / total) * (distribution.default_info() - infox)
}

pub fn gain_ratio(distribution: &Distribution) -> f64 {
    let total = distribution.total_weight();
    if total <= 0.0 {
        return 0.0;
    }
    let mut split_info: f64 = (0..distribution.subsets.len())
        .map(|s| xlog2x(distribution.weight_subset(s) / total))
        .sum();
    split_info += xlog2x(distribution.num_missing / total);
    let g = gain(distribution);
    if g == 0.0 || split_info == 0.0 {
        return 0.0;
    }
    g / -split_info
}

/// Weight falling inside the candidate range, outside of it, and missing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitWeights {
    pub inside: f64,
    pub outside: f64,
    pub missing: f64,
}

impl SplitWeights {
    pub fn total(&self) -> f64 {
        self.inside + self.outside + self.missing
    }
}

/// Cumulative class weights over a dataset sorted on one attribute.
///
/// Row `c` holds prefix sums of the weights of class index `c`, the final row holds the
/// prefix sums over all classes. The instances with a missing value occupy the last
/// `num_missing` positions and never belong to a range.
pub struct FreqTable {
    table: Vec<Vec<f64>>,
    n: usize,
    num_missing: usize,
    num_classes: usize,
}

impl FreqTable {
    /// * `data` - Dataset already sorted with `DataSet::sort_on_attribute`.
    /// * `num_missing` - Count returned by the sort.
    pub fn new(data: &DataSet, num_missing: usize) -> Self {
        let num_classes = data.num_classes();
        let n = data.len();
        let mut table = vec![vec![0.0; n]; num_classes + 1];
        let mut running = vec![0.0; num_classes + 1];
        for (d, p) in data.instances.iter().enumerate() {
            let w = data.weight(d);
            running[p.class_index] += w;
            running[num_classes] += w;
            for (row, r) in table.iter_mut().zip(running.iter()) {
                row[d] = *r;
            }
        }
        FreqTable {
            table,
            n,
            num_missing,
            num_classes,
        }
    }

    #[inline]
    fn last_present(&self) -> usize {
        self.n - 1 - self.num_missing
    }

    #[inline]
    fn cumulative(&self, row: usize, first: usize, last: usize) -> f64 {
        if first == 0 {
            self.table[row][last]
        } else {
            self.table[row][last] - self.table[row][first - 1]
        }
    }

    /// Weight of `class` (all classes for `None`) inside `[first, last]`, or among the
    /// known instances outside it.
    pub fn frequency(&self, first: usize, last: usize, inside: bool, class: Option<usize>) -> f64 {
        let row = class.unwrap_or(self.num_classes);
        let f = self.cumulative(row, first, last);
        if inside {
            f
        } else {
            self.table[row][self.last_present()] - f
        }
    }

    pub fn split_distribution(&self, first: usize, last: usize) -> SplitWeights {
        let inside = self.frequency(first, last, true, None);
        let outside = self.table[self.num_classes][self.last_present()] - inside;
        let missing = self.table[self.num_classes][self.n - 1] - (inside + outside);
        SplitWeights {
            inside,
            outside,
            missing,
        }
    }

    pub fn info(&self, first: usize, last: usize, inside: bool) -> f64 {
        let num_instances = self.frequency(first, last, inside, None);
        if num_instances <= 0.0 {
            return 0.0;
        }
        let info: f64 = (0..self.num_classes)
            .map(|c| xlog2x(self.frequency(first, last, inside, Some(c)) / num_instances))
            .sum();
        -info
    }

    pub fn gain(&self, first: usize, last: usize) -> f64 {
        let dist = self.split_distribution(first, last);
        let total = dist.total();
        let known = dist.inside + dist.outside;
        if known <= 0.0 {
            return 0.0;
        }
        let s1 = (dist.inside / known) * self.info(first, last, true);
        let s2 = (dist.outside / known) * self.info(first, last, false);
        ((total - dist.missing) / total) * (self.info(0, self.last_present(), true) - (s1 + s2))
    }

    pub fn gain_ratio(&self, first: usize, last: usize) -> f64 {
        let dist = self.split_distribution(first, last);
        let total = dist.total();
        let split_info =
            xlog2x(dist.inside / total) + xlog2x(dist.outside / total) + xlog2x(dist.missing / total);
        let g = self.gain(first, last);
        if g == 0.0 || split_info == 0.0 {
            return 0.0;
        }
        g / -split_info
    }
}

/// Direct summation of the weight of `class` inside `[first, last]` (or among the
/// known instances outside it) of a sorted dataset.
pub fn range_frequency(
    data: &DataSet,
    first: usize,
    last: usize,
    inside: bool,
    num_missing: usize,
    class: Option<usize>,
) -> f64 {
    let known = data.len() - num_missing;
    (0..known)
        .filter(|i| (first..=last).contains(i) == inside)
        .filter(|i| class.map_or(true, |c| data.instances[*i].class_index == c))
        .map(|i| data.weight(i))
        .sum()
}

/// The range split of a sorted dataset as an explicit distribution, the summation
/// counterpart of [`FreqTable::gain`] and [`FreqTable::gain_ratio`].
pub fn range_distribution(data: &DataSet, first: usize, last: usize, num_missing: usize) -> Distribution {
    let mut dist = Distribution::new(2, data.num_classes());
    for c in 0..data.num_classes() {
        dist.subsets[0][c] = range_frequency(data, first, last, true, num_missing, Some(c));
        dist.subsets[1][c] = range_frequency(data, first, last, false, num_missing, Some(c));
    }
    dist.num_missing = (data.len() - num_missing..data.len()).map(|i| data.weight(i)).sum();
    dist.invalidate_cache();
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_dataset(rng: &mut StdRng, n: usize, num_classes: i64, missing_rate: f64) -> DataSet {
        let mut data = DataSet::with_attributes(&["x"]);
        for _ in 0..n {
            let v = if rng.gen::<f64>() < missing_rate {
                None
            } else {
                Some(rng.gen_range(0.0..10.0))
            };
            let w = if rng.gen_bool(0.5) { Some(rng.gen_range(0.1..2.0)) } else { None };
            data.add_point(Point::new(vec![v], rng.gen_range(0..num_classes)), w)
                .unwrap();
        }
        data
    }

    #[test]
    fn test_entropy_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..200 {
            let num_classes = rng.gen_range(1..6);
            let mut dist = Distribution::new(1, num_classes);
            for c in 0..num_classes {
                if rng.gen_bool(0.7) {
                    dist.subsets[0][c] = rng.gen_range(0.0..5.0);
                }
            }
            dist.invalidate_cache();
            let e = info(&dist, Some(0));
            assert!(e >= 0.0);
            assert!(e <= (num_classes as f64).log2() + 1e-12);
            let non_zero = dist.subsets[0].iter().filter(|w| **w > 0.0).count();
            if non_zero <= 1 {
                assert_eq!(e, 0.0);
            } else {
                assert!(e > 0.0);
            }
        }
    }

    #[test]
    fn test_entropy_of_uniform_distribution() {
        let mut dist = Distribution::new(1, 4);
        dist.subsets[0] = vec![1.0, 1.0, 1.0, 1.0];
        dist.invalidate_cache();
        assert!((info(&dist, Some(0)) - 2.0).abs() < 1e-12);
        assert!((dist.default_info() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pure_split_gain_ratio() {
        let mut dist = Distribution::new(2, 2);
        dist.subsets[0] = vec![2.0, 0.0];
        dist.subsets[1] = vec![0.0, 2.0];
        dist.invalidate_cache();
        assert!((gain(&dist) - 1.0).abs() < 1e-12);
        assert!((gain_ratio(&dist) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_weight_dilutes_gain() {
        let mut dist = Distribution::new(2, 2);
        dist.subsets[0] = vec![2.0, 0.0];
        dist.subsets[1] = vec![0.0, 2.0];
        dist.num_missing = 4.0;
        dist.invalidate_cache();
        assert!((gain(&dist) - 0.5).abs() < 1e-12);
        assert_eq!(dist.total_weight(), 8.0);
    }

    #[test]
    fn test_degenerate_distribution_has_zero_gain_ratio() {
        let mut dist = Distribution::new(2, 2);
        dist.subsets[0] = vec![3.0, 1.0];
        dist.invalidate_cache();
        assert_eq!(gain_ratio(&dist), 0.0);
        let empty = Distribution::new(2, 2);
        assert_eq!(gain(&empty), 0.0);
        assert_eq!(gain_ratio(&empty), 0.0);
    }

    #[test]
    fn test_table_agrees_with_summation() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut data = random_dataset(&mut rng, 30, 3, 0.2);
            let num_missing = data.sort_on_attribute(0);
            if data.len() - num_missing < 2 {
                continue;
            }
            let table = FreqTable::new(&data, num_missing);
            let known = data.len() - num_missing;
            for first in 0..known {
                for last in first..known {
                    let dist = range_distribution(&data, first, last, num_missing);
                    assert!((table.gain(first, last) - gain(&dist)).abs() < 1e-9);
                    let gr = table.gain_ratio(first, last);
                    assert!((gr - gain_ratio(&dist)).abs() < 1e-9);
                    assert!(gr >= -1e-12 && gr <= 1.0 + 1e-9);
                    for c in 0..data.num_classes() {
                        for inside in [true, false] {
                            let f = table.frequency(first, last, inside, Some(c));
                            let s = range_frequency(&data, first, last, inside, num_missing, Some(c));
                            assert!((f - s).abs() < 1e-9);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_split_distribution_accounts_for_missing() {
        let mut data = DataSet::with_attributes(&["x"]);
        data.add_point(Point::new(vec![Some(1.0)], 0), None).unwrap();
        data.add_point(Point::new(vec![Some(2.0)], 0), Some(2.0)).unwrap();
        data.add_point(Point::new(vec![Some(3.0)], 1), None).unwrap();
        data.add_point(Point::new(vec![None], 1), Some(0.5)).unwrap();
        let num_missing = data.sort_on_attribute(0);
        let table = FreqTable::new(&data, num_missing);
        let dist = table.split_distribution(0, 1);
        assert_eq!(
            dist,
            SplitWeights {
                inside: 3.0,
                outside: 1.0,
                missing: 0.5
            }
        );
    }
}
