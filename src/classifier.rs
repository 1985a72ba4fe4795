//! Decision Tree Classifier
//!
//! A fitted model: the configuration it was built with, the tree, and the training
//! data the tree needs to weigh branches for instances with missing values.
use crate::config::TreeConfig;
use crate::cross_validation::{CrossValidation, CrossValidationResult};
use crate::data::{DataSet, Point};
use crate::decision_list::DecisionList;
use crate::errors::ClassifierError;
use crate::persist::JsonIO;
use crate::progress::{CrossValidationProgress, Progress};
use crate::tree::tree::Tree;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub cfg: TreeConfig,
    pub tree: Tree,
    pub training: DataSet,
}

impl JsonIO for DecisionTreeClassifier {}

impl DecisionTreeClassifier {
    pub fn new(cfg: TreeConfig) -> Self {
        DecisionTreeClassifier {
            cfg,
            tree: Tree::new(),
            training: DataSet::new(),
        }
    }

    /// Grow (and, if configured, prune) a tree on `data`.
    ///
    /// * `data` - Training instances.
    /// * `progress` - Optional progress of the split search.
    pub fn fit(&mut self, data: &DataSet, progress: Option<&Progress>) -> Result<(), ClassifierError> {
        self.cfg.validate()?;
        if data.is_empty() {
            return Err(ClassifierError::EmptyDataSet);
        }
        let start = Instant::now();
        let pool = self.cfg.thread_pool()?;
        let cfg = &self.cfg;
        self.tree = pool.install(|| cfg.build_tree(data, cfg.seed, progress));
        self.training = data.clone();
        info!(
            "Fitted {} tree with {} nodes in {:.2}s.",
            self.cfg.method,
            self.tree.size(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn check_point(&self, point: &Point) -> Result<(), ClassifierError> {
        if point.values.len() != self.training.num_attributes() {
            return Err(ClassifierError::DimensionMismatch(
                point.values.len(),
                self.training.num_attributes(),
            ));
        }
        Ok(())
    }

    /// Class probabilities of `point`, indexed like the training classes.
    pub fn predict_proba(&self, point: &Point) -> Result<Vec<f64>, ClassifierError> {
        self.check_point(point)?;
        Ok(self.tree.predict_proba(point, &self.training))
    }

    pub fn predict(&self, point: &Point) -> Result<Option<i64>, ClassifierError> {
        self.check_point(point)?;
        Ok(self.tree.predict_point(point, &self.training))
    }

    /// Predict every instance of `data`.
    pub fn predict_dataset(&self, data: &DataSet) -> Result<Vec<Option<i64>>, ClassifierError> {
        if data.num_attributes() != self.training.num_attributes() {
            return Err(ClassifierError::DimensionMismatch(
                data.num_attributes(),
                self.training.num_attributes(),
            ));
        }
        let pool = self.cfg.thread_pool()?;
        Ok(pool.install(|| self.tree.predict(data, &self.training)))
    }

    /// Cross-validate this configuration on `data`. The fitted tree is left untouched.
    pub fn cross_validate(
        &self,
        data: &DataSet,
        progress: Option<&CrossValidationProgress>,
    ) -> Result<CrossValidationResult, ClassifierError> {
        CrossValidation::new(data, self.cfg.clone()).run(progress)
    }

    /// Ordered rule list of the tree, `None` unless every rule is axis aligned.
    pub fn decision_list(&self) -> Option<DecisionList> {
        let mut tree = self.tree.clone();
        tree.complete_leaves(&self.training);
        DecisionList::from_tree(&tree, &self.training)
    }

    /// Save the classifier as json, including its training data.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), ClassifierError> {
        self.save(path)
    }

    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildMethod;
    use std::fs;

    fn diagonal() -> DataSet {
        let mut data = DataSet::with_attributes(&["x", "y"]);
        for i in 0..20 {
            for j in 0..20 {
                let (x, y) = (i as f64 / 20.0, j as f64 / 20.0);
                let c = if x + y < 1.0 { 0 } else { 1 };
                data.add_point(Point::from_values(&[x, y], c), None).unwrap();
            }
        }
        data
    }

    #[test]
    fn test_fit_predict() {
        let data = diagonal();
        let mut model = DecisionTreeClassifier::new(TreeConfig::new(BuildMethod::C45));
        model.fit(&data, None).unwrap();
        assert!(model.tree.is_well_formed());
        let predictions = model.predict_dataset(&data).unwrap();
        let correct = predictions
            .iter()
            .zip(data.instances.iter())
            .filter(|(p, i)| **p == Some(i.class_val))
            .count();
        assert!(correct as f64 / data.len() as f64 > 0.9);
        assert_eq!(model.predict(&Point::from_values(&[0.05, 0.05], -1)).unwrap(), Some(0));
        let proba = model.predict_proba(&Point::from_values(&[0.95, 0.95], -1)).unwrap();
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_value_combines_branches() {
        let data = diagonal();
        let mut model = DecisionTreeClassifier::new(TreeConfig::default());
        model.fit(&data, None).unwrap();
        let proba = model.predict_proba(&Point::new(vec![None, Some(0.5)], -1)).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba.iter().all(|p| *p > 0.0 && *p < 1.0));
    }

    #[test]
    fn test_oblique_fit() {
        let data = diagonal();
        let cfg = TreeConfig::new(BuildMethod::HCF).set_seed(5);
        let mut model = DecisionTreeClassifier::new(cfg);
        let progress = Progress::default();
        model.fit(&data, Some(&progress)).unwrap();
        assert!(model.tree.is_well_formed());
        assert!(model.decision_list().is_none() || model.tree.size() == 1);
    }

    #[test]
    fn test_errors() {
        let mut model = DecisionTreeClassifier::default();
        assert!(matches!(
            model.fit(&DataSet::with_attributes(&["x"]), None),
            Err(ClassifierError::EmptyDataSet)
        ));
        model.fit(&diagonal(), None).unwrap();
        assert!(matches!(
            model.predict(&Point::from_values(&[0.1], 0)),
            Err(ClassifierError::DimensionMismatch(1, 2))
        ));
        let other = DataSet::with_attributes(&["x", "y", "z"]);
        assert!(model.predict_dataset(&other).is_err());
    }

    #[test]
    fn test_cross_validate() {
        let model = DecisionTreeClassifier::new(TreeConfig::default().set_folds(4));
        let result = model.cross_validate(&diagonal(), None).unwrap();
        assert_eq!(result.folds.len(), 4);
        assert_eq!(result.confusion.num_test_cases(), 400);
        assert!(result.accuracy() > 0.85);
    }

    #[test]
    fn test_save_load_model() -> Result<(), Box<dyn std::error::Error>> {
        let data = diagonal();
        let mut model = DecisionTreeClassifier::new(TreeConfig::new(BuildMethod::Cavity));
        model.fit(&data, None)?;
        let path = std::env::temp_dir().join("classifier_builder_model_test.json");
        model.save_model(&path)?;
        let loaded = DecisionTreeClassifier::load_model(&path)?;
        fs::remove_file(&path)?;
        assert_eq!(loaded.cfg, model.cfg);
        assert_eq!(loaded.tree, model.tree);
        assert_eq!(loaded.predict_dataset(&data)?, model.predict_dataset(&data)?);
        Ok(())
    }
}
