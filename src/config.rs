//! Tree Configuration
//!
//! Defines the build method and the settings shared by the classifier and the
//! cross-validation harness.
use crate::data::DataSet;
use crate::errors::ClassifierError;
use crate::optimizer::{DifferentialEvolutionParams, HillClimbMode, HillClimbParams};
use crate::persist::JsonIO;
use crate::progress::Progress;
use crate::splitter::{
    AxisSplitter, CavityC45Splitter, CavitySplitter, DifferentialEvolutionSplitter, HillClimbSplitter,
};
use crate::tree::tree::Tree;
use crate::utils::{items_to_strings, validate_float_parameter, validate_min_usize_parameter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Split strategy used to grow a tree.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BuildMethod {
    /// Axis aligned information gain ratio search.
    #[default]
    C45,
    /// Oblique parallel coordinate regions found by differential evolution.
    DE,
    /// Oblique regions found by first improvement hill climbing.
    HCF,
    /// Oblique regions found by best improvement hill climbing.
    HCB,
    /// Oblique regions found by round robin hill climbing.
    HCR,
    /// Nested cavities.
    Cavity,
    /// Nested cavities, falling back to the axis split when it is better.
    CavityC45,
}

impl BuildMethod {
    /// Hill climbing mode, for the hill climbing methods.
    pub fn hill_climb_mode(&self) -> Option<HillClimbMode> {
        match self {
            BuildMethod::HCF => Some(HillClimbMode::FirstImprovement),
            BuildMethod::HCB => Some(HillClimbMode::BestImprovement),
            BuildMethod::HCR => Some(HillClimbMode::RoundRobinImprovement),
            _ => None,
        }
    }
}

impl FromStr for BuildMethod {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C45" => Ok(BuildMethod::C45),
            "DE" => Ok(BuildMethod::DE),
            "HCF" => Ok(BuildMethod::HCF),
            "HCB" => Ok(BuildMethod::HCB),
            "HCR" => Ok(BuildMethod::HCR),
            "Cavity" => Ok(BuildMethod::Cavity),
            "CavityC45" => Ok(BuildMethod::CavityC45),

            _ => Err(ClassifierError::ParseString(
                s.to_string(),
                "BuildMethod".to_string(),
                items_to_strings(vec!["C45", "DE", "HCF", "HCB", "HCR", "Cavity", "CavityC45"]),
            )),
        }
    }
}

impl fmt::Display for BuildMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BuildMethod::C45 => "C45",
            BuildMethod::DE => "DE",
            BuildMethod::HCF => "HCF",
            BuildMethod::HCB => "HCB",
            BuildMethod::HCR => "HCR",
            BuildMethod::Cavity => "Cavity",
            BuildMethod::CavityC45 => "CavityC45",
        };
        write!(f, "{}", s)
    }
}

fn default_folds() -> usize {
    10
}
fn default_true() -> bool {
    true
}

/// Configuration for growing, pruning and validating a tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Split strategy.
    #[serde(default)]
    pub method: BuildMethod,
    /// Differential evolution settings, used by `DE`.
    #[serde(default)]
    pub de_params: DifferentialEvolutionParams,
    /// Hill climbing settings, used by `HCF`, `HCB` and `HCR`.
    #[serde(default)]
    pub hc_params: HillClimbParams,
    /// Number of cross-validation folds.
    #[serde(default = "default_folds")]
    pub folds: usize,
    /// Run cross-validation folds in parallel.
    #[serde(default = "default_true")]
    pub parallel_folds: bool,
    /// Shuffle before stratifying folds.
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// Prune grown trees.
    #[serde(default = "default_true")]
    pub prune: bool,
    /// Number of threads for parallel tasks, all cores when `None`.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Seed for random number generation.
    #[serde(default)]
    pub seed: u64,
    /// Also search the flipped axis orientation in oblique splits.
    /// `None` keeps each strategy's own default.
    #[serde(default)]
    pub search_flipped: Option<bool>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            method: BuildMethod::C45,
            de_params: DifferentialEvolutionParams::default(),
            hc_params: HillClimbParams::default(),
            folds: default_folds(),
            parallel_folds: true,
            shuffle: true,
            prune: true,
            num_threads: None,
            seed: 0,
            search_flipped: None,
        }
    }
}

impl TreeConfig {
    pub fn new(method: BuildMethod) -> Self {
        TreeConfig {
            method,
            ..Default::default()
        }
    }

    pub fn set_method(mut self, method: BuildMethod) -> Self {
        self.method = method;
        self
    }

    pub fn set_de_params(mut self, de_params: DifferentialEvolutionParams) -> Self {
        self.de_params = de_params;
        self
    }

    pub fn set_hc_params(mut self, hc_params: HillClimbParams) -> Self {
        self.hc_params = hc_params;
        self
    }

    pub fn set_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn set_parallel_folds(mut self, parallel_folds: bool) -> Self {
        self.parallel_folds = parallel_folds;
        self
    }

    pub fn set_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn set_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Set the number of threads.
    /// * `num_threads` - Threads used for parallel tasks, `None` for all cores.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn set_search_flipped(mut self, search_flipped: Option<bool>) -> Self {
        self.search_flipped = search_flipped;
        self
    }

    /// Check the settings that would make a build or validation meaningless.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        validate_min_usize_parameter(self.de_params.population_size, 4, "population_size")?;
        validate_float_parameter(self.de_params.mutation_factor, 0.0, 1.0, "mutation_factor")?;
        validate_float_parameter(self.de_params.crossover_factor, 0.0, 1.0, "crossover_factor")?;
        validate_float_parameter(
            self.de_params.percentage_initial_provided,
            0.0,
            1.0,
            "percentage_initial_provided",
        )?;
        validate_float_parameter(self.hc_params.step_size, f64::MIN_POSITIVE, f64::INFINITY, "step_size")?;
        validate_min_usize_parameter(self.folds, 2, "folds")?;
        if let Some(n) = self.num_threads {
            validate_min_usize_parameter(n, 1, "num_threads")?;
        }
        Ok(())
    }

    /// Grow a tree on `data` with the configured method, pruning it if enabled.
    ///
    /// * `data` - Training data.
    /// * `seed` - Seed for the stochastic split searches.
    /// * `progress` - Optional progress of the split search.
    pub fn build_tree(&self, data: &DataSet, seed: u64, progress: Option<&Progress>) -> Tree {
        let mut tree = Tree::new();
        match self.method {
            BuildMethod::C45 => tree.fit(data, &AxisSplitter, progress),
            BuildMethod::DE => {
                let splitter = DifferentialEvolutionSplitter::new(
                    self.de_params.clone(),
                    self.search_flipped.unwrap_or(true),
                    seed,
                );
                tree.fit(data, &splitter, progress)
            }
            BuildMethod::HCF | BuildMethod::HCB | BuildMethod::HCR => {
                let mode = self.hill_climb_mode();
                let splitter = HillClimbSplitter::new(self.hc_params.clone(), mode, seed)
                    .set_search_flipped(self.search_flipped.unwrap_or(false));
                tree.fit(data, &splitter, progress)
            }
            BuildMethod::Cavity => tree.fit(data, &CavitySplitter, progress),
            BuildMethod::CavityC45 => tree.fit(data, &CavityC45Splitter, progress),
        }
        if self.prune {
            tree.prune(data);
        }
        tree
    }

    fn hill_climb_mode(&self) -> HillClimbMode {
        self.method
            .hill_climb_mode()
            .unwrap_or(HillClimbMode::FirstImprovement)
    }

    /// Rayon pool sized by `num_threads`.
    pub fn thread_pool(&self) -> Result<rayon::ThreadPool, ClassifierError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.num_threads {
            builder = builder.num_threads(n);
        }
        builder
            .build()
            .map_err(|e| ClassifierError::ThreadPool(e.to_string()))
    }
}

impl JsonIO for TreeConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Point;

    #[test]
    fn test_config_default() {
        let config = TreeConfig::default();
        assert_eq!(config.method, BuildMethod::C45);
        assert_eq!(config.folds, 10);
        assert!(config.prune);
        assert!(config.parallel_folds);
        assert_eq!(config.de_params.population_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_defaults() {
        let config = TreeConfig::from_json(r#"{"method": "HCB", "folds": 5}"#).unwrap();
        assert_eq!(config.method, BuildMethod::HCB);
        assert_eq!(config.folds, 5);
        assert_eq!(config.hc_params.step_size, 0.05);
        assert!(config.shuffle);
        let dumped = config.json_dump().unwrap();
        assert_eq!(TreeConfig::from_json(&dumped).unwrap(), config);
    }

    #[test]
    fn test_config_save_load() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join("classifier_builder_config_test.json");
        let config = TreeConfig::new(BuildMethod::DE).set_seed(7).set_search_flipped(Some(false));
        config.save(&path)?;
        let loaded = TreeConfig::load(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_config_validate() {
        let mut de_params = DifferentialEvolutionParams::default();
        de_params.population_size = 3;
        assert!(TreeConfig::default().set_de_params(de_params).validate().is_err());
        assert!(TreeConfig::default().set_folds(1).validate().is_err());
        let hc_params = HillClimbParams {
            step_size: 0.0,
            ..Default::default()
        };
        assert!(TreeConfig::default().set_hc_params(hc_params).validate().is_err());
        let mut de_params = DifferentialEvolutionParams::default();
        de_params.crossover_factor = 1.5;
        assert!(TreeConfig::default().set_de_params(de_params).validate().is_err());
    }

    #[test]
    fn test_build_method_parse() {
        for name in ["C45", "DE", "HCF", "HCB", "HCR", "Cavity", "CavityC45"] {
            let method: BuildMethod = name.parse().unwrap();
            assert_eq!(method.to_string(), name);
        }
        assert!("ID3".parse::<BuildMethod>().is_err());
        assert_eq!(
            BuildMethod::HCR.hill_climb_mode(),
            Some(HillClimbMode::RoundRobinImprovement)
        );
        assert_eq!(BuildMethod::DE.hill_climb_mode(), None);
    }

    #[test]
    fn test_build_tree_every_method() {
        let mut data = DataSet::with_attributes(&["x", "y"]);
        for i in 0..40 {
            let x = i as f64 / 40.0;
            let y = ((i * 7) % 40) as f64 / 40.0;
            let c = if x < 0.5 { 0 } else { 1 };
            data.add_point(Point::from_values(&[x, y], c), None).unwrap();
        }
        let mut de_params = DifferentialEvolutionParams::default();
        de_params.iterations = 10;
        de_params.population_size = 10;
        for method in [
            BuildMethod::C45,
            BuildMethod::DE,
            BuildMethod::HCF,
            BuildMethod::HCB,
            BuildMethod::HCR,
            BuildMethod::Cavity,
            BuildMethod::CavityC45,
        ] {
            let config = TreeConfig::new(method).set_de_params(de_params.clone());
            let tree = config.build_tree(&data, 3, None);
            assert!(tree.is_well_formed(), "{}", method);
            assert!(tree.size() >= 1);
        }
    }

    #[test]
    fn test_thread_pool() {
        let pool = TreeConfig::default().set_num_threads(Some(2)).thread_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
