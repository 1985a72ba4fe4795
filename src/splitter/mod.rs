//! Splitters
//!
//! Strategies that look at the instances reaching a node and propose the rule used
//! to split it. Every strategy reports "no usable split" by returning `None`, the tree
//! builder then turns the node into a leaf.
pub mod axis;
pub mod cavity;
pub mod differential_evolution;
pub mod hill_climb;
pub mod oblique;

pub use axis::{find_best_split, AxisSplitter};
pub use cavity::{find_best_cavity, find_best_cavity_c45, CavityC45Splitter, CavityMining, CavitySplitter};
pub use differential_evolution::DifferentialEvolutionSplitter;
pub use hill_climb::HillClimbSplitter;

use crate::data::DataSet;
use crate::progress::Progress;
use crate::rule::Rule;

/// A proposed rule and the gain ratio it achieves on the node's instances.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitInfo {
    pub rule: Rule,
    pub gain_ratio: f64,
}

pub trait Splitter: Sync {
    /// Find the rule to split the node's instances with.
    ///
    /// * `data` - Instances reaching the node, with fractional weights.
    /// * `node` - Number of the node being split, strategies with randomness
    ///   mix it into their seed so sibling nodes do not share a random stream.
    /// * `progress` - Optional counter updated while the search runs.
    fn best_split(&self, data: &DataSet, node: usize, progress: Option<&Progress>) -> Option<SplitInfo>;
}
