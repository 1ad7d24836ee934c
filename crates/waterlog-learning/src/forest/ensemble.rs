//! Random forest classifier.

use super::tree::{DecisionTree, TreeParams};
use crate::config::ForestConfig;
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bagged ensemble of [`DecisionTree`]s voting by majority.
///
/// Trees are grown in parallel; tree `i` draws its bootstrap sample and its
/// per-split feature subsets from `ChaCha8Rng::seed_from_u64(seed + i)`, so
/// the fitted forest does not depend on thread scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
    feature_importances: Array1<f64>,
}

static_assertions::assert_impl_all!(RandomForest: Send, Sync);

impl RandomForest {
    /// Fit the forest.
    ///
    /// `y` holds class indices; the class count is `max(y) + 1`, at least 2.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] for an empty matrix, mismatched
    /// lengths or non-finite features; [`LearningError::InvalidConfig`] for
    /// an invalid configuration.
    pub fn fit(config: &ForestConfig, x: &Array2<f64>, y: &Array1<usize>) -> Result<Self> {
        config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(LearningError::InvalidData(format!(
                "cannot fit on an empty matrix ({} x {})",
                n_samples, n_features
            )));
        }
        if n_samples != y.len() {
            return Err(LearningError::InvalidData(format!(
                "feature matrix has {} rows but {} labels were given",
                n_samples,
                y.len()
            )));
        }
        if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(LearningError::InvalidData(format!(
                "non-finite feature value at row {}, column {}",
                row, col
            )));
        }

        let n_classes = y.iter().copied().max().unwrap_or(0).max(1) + 1;
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(n_features),
        };
        let labels = y.to_vec();

        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = config.random_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Vec<usize> = sample_indices.iter().map(|&i| labels[i]).collect();

                DecisionTree::fit(x_boot.view(), &y_boot, n_classes, &params, rng)
            })
            .collect();

        let feature_importances = average_importances(&trees, n_features);

        debug!(
            "Fitted {} trees (max depth reached: {}, mean leaves: {:.1})",
            trees.len(),
            trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            trees.iter().map(|t| t.n_leaves() as f64).sum::<f64>() / trees.len() as f64
        );

        Ok(Self {
            config: config.clone(),
            trees,
            n_features,
            n_classes,
            feature_importances,
        })
    }

    /// Class of each row by majority vote; ties go to the lowest class.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .outer_iter()
            .map(argmax)
            .collect::<Array1<usize>>())
    }

    /// Fraction of trees voting for each class, one row per input row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.vote_fractions(x.row(i)))
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((x.nrows(), self.n_classes), flat)
            .map_err(|e| LearningError::InferenceError(e.to_string()))
    }

    /// Label and vote fractions of a single feature row.
    pub fn predict_row(&self, row: &[f64]) -> Result<(usize, Vec<f64>)> {
        self.check_width(row.len())?;
        if row.iter().any(|v| !v.is_finite()) {
            return Err(LearningError::InvalidData(
                "prediction row contains a non-finite value".to_string(),
            ));
        }
        let fractions = self.vote_fractions(ArrayView1::from(row));
        let label = argmax(ArrayView1::from(&fractions[..]));
        Ok((label, fractions))
    }

    fn vote_fractions(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict_row(row)] += 1;
        }
        let n_trees = self.trees.len() as f64;
        votes.into_iter().map(|v| v as f64 / n_trees).collect()
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features {
            return Err(LearningError::InvalidData(format!(
                "expected {} features, got {}",
                self.n_features, width
            )));
        }
        Ok(())
    }

    /// Impurity-based importance per feature, summing to 1.
    pub fn feature_importances(&self) -> &Array1<f64> {
        &self.feature_importances
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

/// Mean of the per-tree normalized importances, renormalized.
///
/// Falls back to a uniform distribution when no tree ever split.
fn average_importances(trees: &[DecisionTree], n_features: usize) -> Array1<f64> {
    let mut total = Array1::<f64>::zeros(n_features);
    for tree in trees {
        for (acc, &val) in total.iter_mut().zip(tree.feature_importances()) {
            *acc += val;
        }
    }
    if !trees.is_empty() {
        total /= trees.len() as f64;
    }

    let sum = total.sum();
    if sum > 0.0 {
        total / sum
    } else {
        debug!("No tree split; using uniform feature importances");
        Array1::from_elem(n_features, 1.0 / n_features as f64)
    }
}

/// Index of the largest value; ties go to the lowest index.
fn argmax(values: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (idx, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = idx;
        }
    }
    best
}
