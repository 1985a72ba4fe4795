use crate::data::DataSet;
use crate::optimizer::{DifferentialEvolution, DifferentialEvolutionParams};
use crate::progress::Progress;
use crate::splitter::oblique::{
    attribute_pairs, best_single_splits, search_pairs, ParallelCoordinatesSplit, NUM_PARAMETERS,
};
use crate::splitter::{SplitInfo, Splitter};
use log::warn;
use rand::Rng;

/// One attribute pair as a differential evolution problem.
struct DifferentialEvolutionSplit<'a> {
    split: ParallelCoordinatesSplit<'a>,
}

impl<'a> DifferentialEvolution for DifferentialEvolutionSplit<'a> {
    fn evaluate_cost(&self, parameters: &[f64]) -> f64 {
        self.split.cost(parameters)
    }

    fn number_of_parameters(&self) -> usize {
        NUM_PARAMETERS
    }

    fn constraints(&self) -> Vec<(f64, f64)> {
        self.split.constraints()
    }

    fn initial_candidate<R: Rng>(&mut self, rng: &mut R) -> Vec<f64> {
        let start = if rng.gen_bool(0.5) {
            self.split.first_attribute_start()
        } else {
            self.split.second_attribute_start()
        };
        start.map(|s| s.to_vec()).unwrap_or_default()
    }
}

/// Oblique splits found with differential evolution over every attribute pair.
#[derive(Clone, Debug)]
pub struct DifferentialEvolutionSplitter {
    pub params: DifferentialEvolutionParams,
    /// Also search each pair with the second axis flipped.
    pub search_flipped: bool,
    pub seed: u64,
}

impl Default for DifferentialEvolutionSplitter {
    fn default() -> Self {
        DifferentialEvolutionSplitter {
            params: DifferentialEvolutionParams::default(),
            search_flipped: true,
            seed: 0,
        }
    }
}

impl DifferentialEvolutionSplitter {
    pub fn new(params: DifferentialEvolutionParams, search_flipped: bool, seed: u64) -> Self {
        DifferentialEvolutionSplitter {
            params,
            search_flipped,
            seed,
        }
    }
}

impl Splitter for DifferentialEvolutionSplitter {
    fn best_split(&self, data: &DataSet, node: usize, progress: Option<&Progress>) -> Option<SplitInfo> {
        let pairs = attribute_pairs(data, self.search_flipped);
        if pairs.is_empty() {
            warn!("No pair of attributes with a usable range, no oblique split possible.");
            return None;
        }
        if let Some(p) = progress {
            p.reset(self.params.iterations * pairs.len());
        }
        let singles = best_single_splits(data);
        let on_iteration = || {
            if let Some(p) = progress {
                p.complete_one();
            }
        };
        let seed = self.seed.wrapping_add((node as u64) << 32);
        search_pairs(data, &pairs, seed, |pair, rng| {
            let mut problem = DifferentialEvolutionSplit {
                split: ParallelCoordinatesSplit::new(data, pair, &singles),
            };
            let parameters = problem.optimize(&self.params, rng, Some(&on_iteration));
            let cost = problem.evaluate_cost(&parameters);
            (parameters, cost)
        })
    }
}
