//! Imputation of missing values.
//!
//! - Group-wise mean imputation of a sentinel marker

mod group_mean;

pub use group_mean::{GroupMeanImputer, ImputationSummary};
