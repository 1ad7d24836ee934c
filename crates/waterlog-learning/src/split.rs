//! Seeded shuffle split into training and held-out rows.

use crate::error::{LearningError, Result};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of the two sides of a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n_rows` with `seed` and hold out the first
    /// `ceil(test_size * n_rows)` indices.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidConfig`] when `test_size` is outside `(0, 1)`,
    /// [`LearningError::InvalidData`] when either side would be empty.
    pub fn new(n_rows: usize, test_size: f64, seed: u64) -> Result<Self> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "test_size must be between 0.0 and 1.0 (exclusive), got {}",
                test_size
            )));
        }

        let n_test = (test_size * n_rows as f64).ceil() as usize;
        let n_train = n_rows.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(LearningError::InvalidData(format!(
                "cannot split {} rows with test_size {}: {} train / {} test",
                n_rows, test_size, n_train, n_test
            )));
        }

        let mut permutation: Vec<usize> = (0..n_rows).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        permutation.shuffle(&mut rng);

        let train = permutation.split_off(n_test);
        Ok(Self {
            train,
            test: permutation,
        })
    }
}
