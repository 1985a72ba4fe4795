mod constants;

// Modules
pub mod classifier;
pub mod config;
pub mod cross_validation;
pub mod data;
pub mod decision_list;
pub mod errors;
pub mod hyperplane;
pub mod info;
pub mod metric;
pub mod node;
pub mod optimizer;
pub mod persist;
pub mod progress;
pub mod prune;
pub mod reader;
pub mod rule;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use classifier::DecisionTreeClassifier;
pub use config::{BuildMethod, TreeConfig};
pub use cross_validation::{cross_validate, CrossValidation, CrossValidationResult, FoldResult};
pub use data::{DataSet, Point};
pub use errors::ClassifierError;
pub use persist::JsonIO;
pub use reader::DataSetReader;
pub use rule::Rule;
pub use tree::tree::Tree;
