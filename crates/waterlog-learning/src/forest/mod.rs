//! Random forest classification.
//!
//! - [`DecisionTree`]: a single CART tree split on Gini impurity
//! - [`RandomForest`]: bootstrap-aggregated trees with majority voting

mod ensemble;
mod tree;

pub use ensemble::RandomForest;
pub use tree::{DecisionTree, TreeNode, TreeParams};
