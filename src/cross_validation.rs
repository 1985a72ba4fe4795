//! Cross Validation
//!
//! Stratified k-fold validation of a tree configuration. Folds can run in parallel
//! on the configured rayon pool.
use crate::config::TreeConfig;
use crate::data::DataSet;
use crate::errors::ClassifierError;
use crate::metric::ConfusionMatrix;
use crate::progress::CrossValidationProgress;
use crate::tree::tree::Tree;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of one fold: the tree trained on the other folds and its confusion
/// matrix on this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub confusion: ConfusionMatrix,
    pub tree: Tree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub folds: Vec<FoldResult>,
    /// Sum of the fold matrices.
    pub confusion: ConfusionMatrix,
}

impl CrossValidationResult {
    fn from_folds(folds: Vec<FoldResult>, num_classes: usize) -> Self {
        let mut confusion = ConfusionMatrix::new(num_classes);
        for fold in folds.iter() {
            confusion += &fold.confusion;
        }
        CrossValidationResult { folds, confusion }
    }

    pub fn accuracy(&self) -> f64 {
        self.confusion.accuracy()
    }

    /// Mean number of nodes of the fold trees.
    pub fn mean_tree_size(&self) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        self.folds.iter().map(|f| f.tree.size()).sum::<usize>() as f64 / self.folds.len() as f64
    }
}

/// Pairs a dataset with the configuration to validate on it.
///
/// ```no_run
/// use classifier_builder::config::{BuildMethod, TreeConfig};
/// use classifier_builder::cross_validation::CrossValidation;
/// use classifier_builder::reader::DataSetReader;
///
/// let data = DataSetReader::new().file("iris.csv").read().unwrap();
/// let config = TreeConfig::new(BuildMethod::C45).set_folds(5);
/// let result = CrossValidation::new(&data, config).run(None).unwrap();
/// println!("accuracy {}", result.accuracy());
/// ```
pub struct CrossValidation<'a> {
    data: &'a DataSet,
    cfg: TreeConfig,
}

impl<'a> CrossValidation<'a> {
    pub fn new(data: &'a DataSet, cfg: TreeConfig) -> Self {
        CrossValidation { data, cfg }
    }

    /// Instance indices of each fold.
    ///
    /// Instances are shuffled with the configured seed (when shuffling is on), stably
    /// sorted by class value and dealt round robin, so each class is spread over the
    /// folds as evenly as possible.
    pub fn fold_indices(&self) -> Vec<Vec<usize>> {
        let k = self.cfg.folds.max(1);
        let mut order: Vec<usize> = (0..self.data.len()).collect();
        if self.cfg.shuffle {
            let mut rng = StdRng::seed_from_u64(self.cfg.seed);
            order.shuffle(&mut rng);
        }
        order.sort_by_key(|&i| self.data.instances[i].class_val);

        let mut folds = vec![Vec::with_capacity(order.len() / k + 1); k];
        for (position, i) in order.into_iter().enumerate() {
            folds[position % k].push(i);
        }
        folds
    }

    /// Training and test sets of fold `fold`.
    pub fn split(&self, folds: &[Vec<usize>], fold: usize) -> (DataSet, DataSet) {
        let mut train = self.data.view();
        let mut test = self.data.view();
        for (f, indices) in folds.iter().enumerate() {
            let target = if f == fold { &mut test } else { &mut train };
            for &i in indices {
                target.push_point(self.data.instances[i].clone(), self.data.weights[i]);
            }
        }
        (train, test)
    }

    /// Build, prune and score a tree for every fold.
    ///
    /// * `progress` - Optional counter of completed folds. When folds run one at a
    ///   time it also follows the split search of the running fold.
    pub fn run(&self, progress: Option<&CrossValidationProgress>) -> Result<CrossValidationResult, ClassifierError> {
        self.cfg.validate()?;
        if self.data.is_empty() {
            return Err(ClassifierError::EmptyDataSet);
        }
        let folds = self.fold_indices();
        if let Some(p) = progress {
            p.folds.reset(folds.len());
        }
        let pool = self.cfg.thread_pool()?;

        let results: Vec<FoldResult> = pool.install(|| {
            if self.cfg.parallel_folds {
                (0..folds.len())
                    .into_par_iter()
                    .map(|f| self.run_fold(&folds, f, progress, false))
                    .collect()
            } else {
                (0..folds.len())
                    .map(|f| self.run_fold(&folds, f, progress, true))
                    .collect()
            }
        });

        let result = CrossValidationResult::from_folds(results, self.data.num_classes());
        info!(
            "{}-fold cross validation with {}: accuracy {:.4}, macro F {:.4}, mean tree size {:.1}.",
            folds.len(),
            self.cfg.method,
            result.accuracy(),
            result.confusion.macro_f_measure(),
            result.mean_tree_size()
        );
        Ok(result)
    }

    fn run_fold(
        &self,
        folds: &[Vec<usize>],
        fold: usize,
        progress: Option<&CrossValidationProgress>,
        track_split: bool,
    ) -> FoldResult {
        let (train, test) = self.split(folds, fold);
        let split_progress = if track_split { progress.map(|p| &p.split) } else { None };
        let seed = self.cfg.seed.wrapping_add(fold as u64);
        let tree = self.cfg.build_tree(&train, seed, split_progress);

        let mut confusion = ConfusionMatrix::new(self.data.num_classes());
        let predictions = tree.predict(&test, &train);
        for (point, predicted) in test.instances.iter().zip(predictions) {
            let actual = self.data.class_index(point.class_val);
            let predicted = predicted.and_then(|c| self.data.class_index(c));
            if let (Some(a), Some(p)) = (actual, predicted) {
                confusion.add(p, a);
            }
        }
        debug!(
            "Fold {}: {} training, {} test instances, accuracy {:.4}.",
            fold,
            train.len(),
            test.len(),
            confusion.accuracy()
        );
        if let Some(p) = progress {
            p.folds.complete_one();
        }
        FoldResult { confusion, tree }
    }
}

/// Run a stratified cross validation of `cfg` on `data`.
pub fn cross_validate(
    data: &DataSet,
    cfg: &TreeConfig,
    progress: Option<&CrossValidationProgress>,
) -> Result<CrossValidationResult, ClassifierError> {
    CrossValidation::new(data, cfg.clone()).run(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildMethod;
    use crate::data::Point;
    use rand::Rng;

    fn three_classes(n: usize, seed: u64) -> DataSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = DataSet::with_attributes(&["x", "y"]);
        for i in 0..n {
            // uneven class sizes
            let c: i64 = if i % 5 < 3 { 0 } else if i % 5 == 3 { 1 } else { 2 };
            let x = c as f64 + rng.gen_range(0.0..0.8);
            let y = rng.gen_range(0.0..1.0);
            data.add_point(Point::from_values(&[x, y], c), None).unwrap();
        }
        data
    }

    #[test]
    fn test_folds_partition_data() {
        let data = three_classes(53, 1);
        let cv = CrossValidation::new(&data, TreeConfig::default().set_folds(4));
        let folds = cv.fold_indices();
        assert_eq!(folds.len(), 4);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..53).collect::<Vec<_>>());

        let (train, test) = cv.split(&folds, 2);
        assert_eq!(train.len() + test.len(), 53);
        assert_eq!(test.len(), folds[2].len());
        assert_eq!(train.classes, data.classes);
    }

    #[test]
    fn test_folds_are_stratified() {
        let data = three_classes(97, 2);
        let cv = CrossValidation::new(&data, TreeConfig::default().set_folds(5).set_seed(11));
        let folds = cv.fold_indices();
        for class in 0..3 {
            let counts: Vec<usize> = folds
                .iter()
                .map(|f| f.iter().filter(|&&i| data.instances[i].class_val == class).count())
                .collect();
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1, "class {} counts {:?}", class, counts);
        }
    }

    #[test]
    fn test_fold_order_depends_on_seed() {
        let data = three_classes(60, 3);
        let a = CrossValidation::new(&data, TreeConfig::default().set_seed(1)).fold_indices();
        let b = CrossValidation::new(&data, TreeConfig::default().set_seed(1)).fold_indices();
        let c = CrossValidation::new(&data, TreeConfig::default().set_seed(2)).fold_indices();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_cross_validate_separable() {
        let data = three_classes(150, 4);
        let cfg = TreeConfig::new(BuildMethod::C45).set_folds(5);
        let progress = CrossValidationProgress::new(0);
        let result = cross_validate(&data, &cfg, Some(&progress)).unwrap();
        assert_eq!(result.folds.len(), 5);
        assert_eq!(result.confusion.num_test_cases(), 150);
        assert!(result.accuracy() > 0.9, "accuracy {}", result.accuracy());
        assert!(result.confusion.macro_f_measure() > 0.85);
        assert_eq!(progress.snapshot().0, 1.0);
        for fold in result.folds.iter() {
            assert!(fold.tree.is_well_formed());
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = three_classes(80, 5);
        let cfg = TreeConfig::new(BuildMethod::C45).set_folds(4).set_num_threads(Some(2));
        let parallel = cross_validate(&data, &cfg, None).unwrap();
        let sequential = cross_validate(&data, &cfg.clone().set_parallel_folds(false), None).unwrap();
        assert_eq!(parallel.confusion, sequential.confusion);
    }

    #[test]
    fn test_cross_validate_rejects_bad_input() {
        let empty = DataSet::with_attributes(&["x"]);
        assert!(matches!(
            cross_validate(&empty, &TreeConfig::default(), None),
            Err(ClassifierError::EmptyDataSet)
        ));
        let data = three_classes(20, 6);
        assert!(matches!(
            cross_validate(&data, &TreeConfig::default().set_folds(1), None),
            Err(ClassifierError::InvalidParameter(..))
        ));
    }
}
