//! Errors
//!
//! Custom error types used throughout the `classifier-builder` crate.
use thiserror::Error;

/// Errors that can occur while loading data, building or persisting a classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Unable to write a tree, result or dataset.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read a tree, result or dataset.
    #[error("Unable to read from file {0}")]
    UnableToRead(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// A point does not have one value per attribute.
    #[error("Point has {0} values, but the dataset has {1} attributes.")]
    DimensionMismatch(usize, usize),
    /// A missing value was found where complete data is required.
    #[error("Instance {0} has a missing value for attribute {1}, impute the data first.")]
    MissingValue(usize, usize),
    /// An operation needed at least one instance.
    #[error("The dataset contains no instances.")]
    EmptyDataSet,
    /// The rayon thread pool could not be created.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}
