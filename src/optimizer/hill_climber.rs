use crate::errors::ClassifierError;
use crate::utils::items_to_strings;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a hill climber chooses among improving neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HillClimbMode {
    /// Take the first improving move in the fixed move order.
    FirstImprovement,
    /// Evaluate every move and take the best improving one.
    BestImprovement,
    /// Take the first improving move, then continue the next scan after it.
    RoundRobinImprovement,
}

impl FromStr for HillClimbMode {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FirstImprovement" => Ok(HillClimbMode::FirstImprovement),
            "BestImprovement" => Ok(HillClimbMode::BestImprovement),
            "RoundRobinImprovement" => Ok(HillClimbMode::RoundRobinImprovement),
            _ => Err(ClassifierError::ParseString(
                s.to_string(),
                "HillClimbMode".to_string(),
                items_to_strings(vec!["FirstImprovement", "BestImprovement", "RoundRobinImprovement"]),
            )),
        }
    }
}

impl fmt::Display for HillClimbMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            HillClimbMode::FirstImprovement => "FirstImprovement",
            HillClimbMode::BestImprovement => "BestImprovement",
            HillClimbMode::RoundRobinImprovement => "RoundRobinImprovement",
        };
        write!(f, "{}", s)
    }
}

fn default_max_iterations() -> usize {
    300
}
fn default_step_size() -> f64 {
    0.05
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HillClimbParams {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_step_size")]
    pub step_size: f64,
}

impl Default for HillClimbParams {
    fn default() -> Self {
        HillClimbParams {
            max_iterations: default_max_iterations(),
            step_size: default_step_size(),
        }
    }
}

pub trait HillClimber {
    fn evaluate_cost(&self, parameters: &[f64]) -> f64;
    fn number_of_parameters(&self) -> usize;
    /// Range used to fill in parameters the initial candidate does not provide.
    fn constraints(&self) -> Vec<(f64, f64)>;
    /// Starting point, possibly shorter than the number of parameters.
    fn initial_candidate<R: Rng>(&mut self, rng: &mut R) -> Vec<f64>;

    /// Step each parameter up or down by `step_size` while that lowers the cost.
    /// Moves are not bounded by the constraints.
    fn optimize<R: Rng>(&mut self, params: &HillClimbParams, mode: HillClimbMode, rng: &mut R) -> Vec<f64> {
        let n_params = self.number_of_parameters();
        let constraints = self.constraints();
        let mut current = self.initial_candidate(rng);
        current.truncate(n_params);
        for (min, max) in constraints.iter().skip(current.len()).take(n_params) {
            current.push(rng.gen_range(*min..=*max));
        }
        let mut current_cost = self.evaluate_cost(&current);

        let mut moves: Vec<(usize, f64)> = (0..n_params)
            .flat_map(|i| [(i, -1.0), (i, 1.0)])
            .collect();

        for _ in 0..params.max_iterations {
            let mut accepted: Option<(usize, Vec<f64>, f64)> = None;
            for (k, (i, direction)) in moves.iter().enumerate() {
                let mut candidate = current.clone();
                candidate[*i] += params.step_size * direction;
                let cost = self.evaluate_cost(&candidate);
                let threshold = match (&accepted, mode) {
                    (Some((_, _, best)), HillClimbMode::BestImprovement) => *best,
                    _ => current_cost,
                };
                if cost < threshold {
                    accepted = Some((k, candidate, cost));
                    if mode != HillClimbMode::BestImprovement {
                        break;
                    }
                }
            }
            match accepted {
                Some((k, candidate, cost)) => {
                    current = candidate;
                    current_cost = cost;
                    if mode == HillClimbMode::RoundRobinImprovement {
                        moves.rotate_left(k + 1);
                    }
                }
                None => break,
            }
        }
        current
    }
}
