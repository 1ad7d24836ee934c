//! CART classification tree with Gini impurity.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Smallest impurity decrease that counts as a split.
const MIN_GAIN: f64 = 1e-12;

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split.
    pub max_features: usize,
}

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf voting for the majority class of its training rows.
    Leaf { class: usize, n_samples: usize },
    /// Internal node; rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
    n_features: usize,
    /// Impurity decrease per feature, normalized to sum to 1 (all zero if
    /// the tree never split).
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on every row of `x`.
    ///
    /// `y` holds class indices below `n_classes`. The caller guarantees
    /// `x.nrows() == y.len()` and at least one row.
    pub fn fit<'a>(
        x: ArrayView2<'a, f64>,
        y: &'a [usize],
        n_classes: usize,
        params: &'a TreeParams,
        rng: ChaCha8Rng,
    ) -> Self {
        let mut grower = Grower {
            x,
            y,
            n_classes,
            params,
            rng,
            importances: vec![0.0; x.ncols()],
        };
        let root = grower.grow((0..y.len()).collect(), 0);

        let mut importances = grower.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Self {
            root,
            n_features: x.ncols(),
            feature_importances: importances,
        }
    }

    /// Class voted for by the leaf `row` falls into.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { class, .. } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Depth of the deepest leaf; a lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => walk(left) + walk(right),
            }
        }
        walk(&self.root)
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Grower<'a> {
    x: ArrayView2<'a, f64>,
    y: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
    rng: ChaCha8Rng,
    importances: Vec<f64>,
}

impl Grower<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(&indices);
        let class = majority_class(&counts);
        let impurity = gini(&counts, n_samples);

        let should_stop = self.params.max_depth.is_some_and(|d| depth >= d)
            || n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
            || impurity <= 0.0;
        if should_stop {
            return TreeNode::Leaf { class, n_samples };
        }

        let Some(split) = self.best_split(&indices, &counts, impurity) else {
            return TreeNode::Leaf { class, n_samples };
        };

        let x = self.x;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);

        self.importances[split.feature] += n_samples as f64 * split.gain;

        let left = Box::new(self.grow(left, depth + 1));
        let right = Box::new(self.grow(right, depth + 1));

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            n_samples,
        }
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Best threshold over a random feature subset, scanning each feature in
    /// sorted order with running class counts.
    fn best_split(&mut self, indices: &[usize], totals: &[usize], parent: f64) -> Option<BestSplit> {
        let n_features = self.x.ncols();
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let candidates = index::sample(
            &mut self.rng,
            n_features,
            self.params.max_features.min(n_features),
        );

        let mut best: Option<BestSplit> = None;
        for feature in candidates.iter() {
            let mut column: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.x[[i, feature]], self.y[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = totals.to_vec();

            for pos in 0..n - 1 {
                let (value, class) = column[pos];
                left[class] += 1;
                right[class] -= 1;

                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                let gain = parent - weighted;
                let threshold_gain = best.as_ref().map_or(MIN_GAIN, |b| b.gain);
                if gain > threshold_gain {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / n).powi(2))
        .sum::<f64>()
}

/// Most frequent class; ties go to the lowest index.
fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn params(max_features: usize) -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_separable_data_is_learned() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let tree = DecisionTree::fit(x.view(), &y, 2, &params(1), rng());

        for (row, &label) in x.outer_iter().zip(y.iter()) {
            assert_eq!(tree.predict_row(row), label);
        }
        assert_eq!(tree.depth(), 1);
        match tree.root() {
            TreeNode::Split { threshold, .. } => assert_eq!(*threshold, 6.5),
            other => panic!("expected a split, got {other:?}"),
        }
    }

    #[test]
    fn test_fit_on_borrowed_subview() {
        let x = array![[1.0], [2.0], [9.0], [10.0], [50.0]];
        let labels = vec![0, 0, 1, 1, 1];
        let tree = {
            let limits = params(1);
            DecisionTree::fit(x.slice(ndarray::s![..4, ..]), &labels[..4], 2, &limits, rng())
        };

        assert_eq!(tree.n_features(), 1);
        assert_eq!(tree.predict_row(x.row(0)), 0);
        assert_eq!(tree.predict_row(x.row(4)), 1);
    }

    #[test]
    fn test_pure_node_is_a_leaf() {
        let x = array![[1.0, 5.0], [2.0, 6.0], [3.0, 7.0]];
        let tree = DecisionTree::fit(x.view(), &[1, 1, 1], 2, &params(2), rng());
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.feature_importances(), &[0.0, 0.0]);
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_splits() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [0, 1, 1, 1];
        let tree = DecisionTree::fit(
            x.view(),
            &y,
            2,
            &TreeParams {
                min_samples_leaf: 2,
                ..params(1)
            },
            rng(),
        );
        // the only useful split would leave a single row on the left
        assert!(tree.n_leaves() <= 2);
        if let TreeNode::Split { left, right, .. } = tree.root() {
            for child in [left, right] {
                match child.as_ref() {
                    TreeNode::Leaf { n_samples, .. } => assert!(*n_samples >= 2),
                    TreeNode::Split { .. } => panic!("unexpected second level"),
                }
            }
        }
    }

    #[test]
    fn test_max_depth_is_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = [0, 1, 0, 1, 0, 1, 0, 1];
        let tree = DecisionTree::fit(
            x.view(),
            &y,
            2,
            &TreeParams {
                max_depth: Some(2),
                ..params(1)
            },
            rng(),
        );
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_importances_point_at_informative_feature() {
        // feature 0 is noise, feature 1 separates the classes
        let x = array![
            [5.0, 1.0],
            [1.0, 2.0],
            [4.0, 3.0],
            [2.0, 10.0],
            [5.0, 11.0],
            [1.0, 12.0]
        ];
        let y = [0, 0, 0, 1, 1, 1];
        let tree = DecisionTree::fit(x.view(), &y, 2, &params(2), rng());

        let imp = tree.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(imp[1], 1.0);
    }

    #[test]
    fn test_majority_class_ties_go_low() {
        assert_eq!(majority_class(&[2, 2]), 0);
        assert_eq!(majority_class(&[1, 3]), 1);
        assert_eq!(majority_class(&[0, 0]), 0);
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[2, 2], 4), 0.5);
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }
}
