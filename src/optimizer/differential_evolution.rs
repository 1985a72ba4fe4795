use crate::constants::DE_MAX_REJECTIONS;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_iterations() -> usize {
    100
}
fn default_population_size() -> usize {
    50
}
fn default_mutation_factor() -> f64 {
    0.6
}
fn default_crossover_factor() -> f64 {
    0.4
}
fn default_percentage_initial_provided() -> f64 {
    0.15
}

/// Settings for [`DifferentialEvolution::optimize`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifferentialEvolutionParams {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Scale `F` of the difference vector.
    #[serde(default = "default_mutation_factor")]
    pub mutation_factor: f64,
    /// Probability `CR` of taking a mutant component during crossover.
    #[serde(default = "default_crossover_factor")]
    pub crossover_factor: f64,
    /// Share of the initial population taken from `initial_candidate`.
    #[serde(default = "default_percentage_initial_provided")]
    pub percentage_initial_provided: f64,
}

impl Default for DifferentialEvolutionParams {
    fn default() -> Self {
        DifferentialEvolutionParams {
            iterations: default_iterations(),
            population_size: default_population_size(),
            mutation_factor: default_mutation_factor(),
            crossover_factor: default_crossover_factor(),
            percentage_initial_provided: default_percentage_initial_provided(),
        }
    }
}

fn random_candidate<R: Rng>(constraints: &[(f64, f64)], rng: &mut R) -> Vec<f64> {
    constraints.iter().map(|(min, max)| rng.gen_range(*min..=*max)).collect()
}

fn out_of_bounds(candidate: &[f64], constraints: &[(f64, f64)]) -> bool {
    candidate
        .iter()
        .zip(constraints.iter())
        .any(|(v, (min, max))| v < min || v > max)
}

pub trait DifferentialEvolution {
    fn evaluate_cost(&self, parameters: &[f64]) -> f64;
    fn number_of_parameters(&self) -> usize;
    /// Inclusive `(min, max)` per parameter.
    fn constraints(&self) -> Vec<(f64, f64)>;
    /// A seeded starting point, a vector of the wrong length is replaced by a random one.
    fn initial_candidate<R: Rng>(&mut self, rng: &mut R) -> Vec<f64>;

    /// Minimize the cost, returning the best agent of the final population.
    ///
    /// Trial vectors leaving the constraints are drawn again for the same agent
    /// instead of being clamped. `on_iteration` is called after every generation.
    fn optimize<R: Rng>(
        &mut self,
        params: &DifferentialEvolutionParams,
        rng: &mut R,
        on_iteration: Option<&(dyn Fn() + Sync)>,
    ) -> Vec<f64> {
        let n_params = self.number_of_parameters();
        let constraints = self.constraints();
        let population_size = params.population_size.max(1);

        let provided = if params.percentage_initial_provided > 0.0 && params.percentage_initial_provided <= 1.0 {
            (params.percentage_initial_provided * population_size as f64) as usize
        } else {
            0
        };

        let mut population: Vec<Vec<f64>> = Vec::with_capacity(population_size);
        for _ in 0..provided {
            let mut candidate = self.initial_candidate(rng);
            if candidate.len() != n_params {
                candidate = random_candidate(&constraints, rng);
            }
            population.push(candidate);
        }
        while population.len() < population_size {
            population.push(random_candidate(&constraints, rng));
        }
        let mut cost_per_agent: Vec<f64> = population.iter().map(|p| self.evaluate_cost(p)).collect();

        let mut min_cost = f64::INFINITY;
        let mut best_agent = 0;
        for (p, c) in cost_per_agent.iter().enumerate() {
            if *c < min_cost {
                min_cost = *c;
                best_agent = p;
            }
        }

        // Three distinct donors other than the target are needed.
        if population_size < 4 || n_params == 0 {
            return population.swap_remove(best_agent);
        }

        for _ in 0..params.iterations {
            for x in 0..population_size {
                let mut rejections = 0;
                let trial = loop {
                    let (mut a, mut b, mut c) = (x, x, x);
                    while a == x || b == x || c == x || a == b || a == c || b == c {
                        a = rng.gen_range(0..population_size);
                        b = rng.gen_range(0..population_size);
                        c = rng.gen_range(0..population_size);
                    }
                    let mut z = population[a].clone();
                    for j in 0..n_params {
                        z[j] += params.mutation_factor * (population[b][j] - population[c][j]);
                    }
                    let forced = rng.gen_range(0..n_params);
                    for j in 0..n_params {
                        if !(rng.gen::<f64>() < params.crossover_factor || j == forced) {
                            z[j] = population[x][j];
                        }
                    }
                    if !out_of_bounds(&z, &constraints) {
                        break Some(z);
                    }
                    rejections += 1;
                    if rejections >= DE_MAX_REJECTIONS {
                        debug!("Agent {} kept after {} rejected trial vectors.", x, rejections);
                        break None;
                    }
                };

                if let Some(z) = trial {
                    let new_cost = self.evaluate_cost(&z);
                    if new_cost < cost_per_agent[x] {
                        population[x] = z;
                        cost_per_agent[x] = new_cost;
                    }
                }
                if cost_per_agent[x] < min_cost {
                    min_cost = cost_per_agent[x];
                    best_agent = x;
                }
            }
            if let Some(f) = on_iteration {
                f();
            }
        }

        population.swap_remove(best_agent)
    }
}
