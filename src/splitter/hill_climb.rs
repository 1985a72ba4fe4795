use crate::data::DataSet;
use crate::optimizer::{HillClimbMode, HillClimbParams, HillClimber};
use crate::progress::Progress;
use crate::splitter::oblique::{
    attribute_pairs, best_single_splits, search_pairs, ParallelCoordinatesSplit, NUM_PARAMETERS,
};
use crate::splitter::{SplitInfo, Splitter};
use log::warn;
use rand::Rng;

/// One attribute pair as a hill climbing problem.
struct HillClimberSplit<'a> {
    split: ParallelCoordinatesSplit<'a>,
}

impl<'a> HillClimber for HillClimberSplit<'a> {
    fn evaluate_cost(&self, parameters: &[f64]) -> f64 {
        self.split.cost(parameters)
    }

    fn number_of_parameters(&self) -> usize {
        NUM_PARAMETERS
    }

    fn constraints(&self) -> Vec<(f64, f64)> {
        self.split.constraints()
    }

    /// The first attribute's best split stretched to a random horizontal extent,
    /// or a random rectangle when that attribute has none.
    fn initial_candidate<R: Rng>(&mut self, rng: &mut R) -> Vec<f64> {
        match self.split.first_attribute_start() {
            Some(mut start) => {
                let x1: f64 = rng.gen_range(0.0..=1.0);
                let x2: f64 = rng.gen_range(0.0..=1.0);
                start[0] = x1.min(x2);
                start[2] = x1.max(x2);
                start.to_vec()
            }
            None => (0..NUM_PARAMETERS).map(|_| rng.gen_range(0.0..=1.0)).collect(),
        }
    }
}

/// Oblique splits found by hill climbing from a warm start, over every attribute pair.
#[derive(Clone, Debug)]
pub struct HillClimbSplitter {
    pub params: HillClimbParams,
    pub mode: HillClimbMode,
    pub search_flipped: bool,
    pub seed: u64,
}

impl HillClimbSplitter {
    pub fn new(params: HillClimbParams, mode: HillClimbMode, seed: u64) -> Self {
        HillClimbSplitter {
            params,
            mode,
            search_flipped: false,
            seed,
        }
    }

    pub fn set_search_flipped(mut self, search_flipped: bool) -> Self {
        self.search_flipped = search_flipped;
        self
    }
}

impl Splitter for HillClimbSplitter {
    fn best_split(&self, data: &DataSet, node: usize, progress: Option<&Progress>) -> Option<SplitInfo> {
        let pairs = attribute_pairs(data, self.search_flipped);
        if pairs.is_empty() {
            warn!("No pair of attributes with a usable range, no oblique split possible.");
            return None;
        }
        if let Some(p) = progress {
            p.reset(pairs.len());
        }
        let singles = best_single_splits(data);
        let seed = self.seed.wrapping_add((node as u64) << 32);
        search_pairs(data, &pairs, seed, |pair, rng| {
            let mut problem = HillClimberSplit {
                split: ParallelCoordinatesSplit::new(data, pair, &singles),
            };
            let parameters = problem.optimize(&self.params, self.mode, rng);
            let cost = problem.evaluate_cost(&parameters);
            if let Some(p) = progress {
                p.complete_one();
            }
            (parameters, cost)
        })
    }
}
