//! Bagged-tree ensemble: a random forest of CART classification trees.
//!
//! Each tree is grown on a bootstrap resample, choosing the best Gini split
//! among a random subset of features at every node. The forest predicts by
//! majority vote.
//!
//! # References
//!
//! - Breiman, L. (2001). "Random Forests", *Machine Learning* 45, pp. 5-32.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{Error, Result};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    /// Number of trees.
    pub n_trees: usize,
    /// Depth limit; `None` grows until nodes are pure or too small.
    pub max_depth: Option<usize>,
    /// Smallest node that may be split.
    pub min_samples_split: usize,
    /// Features examined per split; `None` means ⌈√p⌉.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Single CART classification tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: Node,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
    rng: Xoshiro256PlusPlus,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

/// Most frequent class; lowest code wins ties.
fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (k, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = k;
        }
    }
    best
}

impl TreeBuilder<'_> {
    fn counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    fn build(&mut self, rows: &[usize], depth: usize) -> Node {
        let counts = self.counts(rows);
        let leaf = Node::Leaf {
            class: majority(&counts),
        };

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_deep = self.max_depth.is_some_and(|d| depth >= d);
        if pure || too_deep || rows.len() < self.min_samples_split {
            return leaf;
        }

        let Some((feature, threshold)) = self.best_split(rows, &counts) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.x[r][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(&left, depth + 1)),
            right: Box::new(self.build(&right, depth + 1)),
        }
    }

    /// Best (feature, threshold) by weighted Gini among a random feature subset.
    fn best_split(&mut self, rows: &[usize], parent_counts: &[usize]) -> Option<(usize, f64)> {
        let n = rows.len();
        let width = self.x[rows[0]].len();
        let candidates = index::sample(&mut self.rng, width, self.max_features.min(width));

        let parent = gini(parent_counts, n);
        let mut best: Option<(usize, f64)> = None;
        let mut best_impurity = parent;

        for feature in candidates.iter() {
            let mut order: Vec<usize> = rows.to_vec();
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.to_vec();
            for k in 0..n - 1 {
                let class = self.y[order[k]];
                left[class] += 1;
                right[class] -= 1;

                let v = self.x[order[k]][feature];
                let next = self.x[order[k + 1]][feature];
                if next <= v {
                    continue;
                }

                let nl = k + 1;
                let nr = n - nl;
                let impurity =
                    (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / n as f64;
                if impurity < best_impurity - 1e-12 {
                    best_impurity = impurity;
                    best = Some((feature, v + (next - v) / 2.0));
                }
            }
        }
        best
    }
}

impl DecisionTree {
    fn grow(
        x: &[Vec<f64>],
        y: &[usize],
        rows: &[usize],
        n_classes: usize,
        params: &ForestParams,
        max_features: usize,
        seed: u64,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            max_features,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        };
        Self {
            root: builder.build(rows, 0),
        }
    }

    /// Class of the leaf reached by `row`.
    pub fn predict(&self, row: &[f64]) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

/// Random forest classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    params: ForestParams,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Grows `params.n_trees` trees on bootstrap resamples.
    ///
    /// # Errors
    ///
    /// [`crate::DomainError::InvalidInput`] if inputs are empty or
    /// inconsistent, a label is out of range, or `n_trees == 0`.
    pub fn fit(
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        params: ForestParams,
        seed: u64,
    ) -> Result<Self> {
        if x.is_empty() || x.len() != labels.len() {
            return Err(Error::invalid("forest needs equally sized, non-empty inputs"));
        }
        if labels.iter().any(|&l| l >= n_classes) {
            return Err(Error::invalid("label code out of range"));
        }
        if params.n_trees == 0 {
            return Err(Error::invalid("forest needs at least one tree"));
        }
        let width = x[0].len();
        if width == 0 || x.iter().any(|r| r.len() != width) {
            return Err(Error::invalid("ragged or empty feature rows"));
        }

        let max_features = params
            .max_features
            .unwrap_or_else(|| (width as f64).sqrt().ceil() as usize)
            .clamp(1, width);

        let n = x.len();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                let tree_seed: u64 = rng.random();
                DecisionTree::grow(x, labels, &rows, n_classes, &params, max_features, tree_seed)
            })
            .collect();

        Ok(Self {
            params,
            n_classes,
            trees,
        })
    }

    /// Hyperparameters used at fit time.
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fitted trees.
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Majority vote over trees (lowest code on ties).
    pub fn predict(&self, row: &[f64]) -> usize {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(row)] += 1;
        }
        majority(&votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }

    fn stripes() -> (Vec<Vec<f64>>, Vec<usize>) {
        // class depends only on feature 0; feature 1 is noise
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let f0 = i as f64;
            let f1 = ((i * 37) % 11) as f64;
            x.push(vec![f0, f1]);
            y.push(i / 20);
        }
        (x, y)
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini(&[5, 0], 5), 0.0);
        assert!((gini(&[5, 5], 10) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn majority_prefers_lowest_on_tie() {
        assert_eq!(majority(&[2, 3, 3]), 1);
        assert_eq!(majority(&[0, 0]), 0);
    }

    #[test]
    fn single_tree_fits_training_data() {
        let (x, y) = stripes();
        let rows: Vec<usize> = (0..x.len()).collect();
        let p = ForestParams {
            max_features: Some(2),
            ..params()
        };
        let tree = DecisionTree::grow(&x, &y, &rows, 3, &p, 2, 0);
        for (r, &c) in x.iter().zip(&y) {
            assert_eq!(tree.predict(r), c);
        }
        assert!(tree.depth() >= 2);
    }

    #[test]
    fn depth_limit_is_respected() {
        let (x, y) = stripes();
        let rows: Vec<usize> = (0..x.len()).collect();
        let p = ForestParams {
            max_depth: Some(1),
            ..params()
        };
        let tree = DecisionTree::grow(&x, &y, &rows, 3, &p, 2, 0);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn forest_classifies_stripes() {
        let (x, y) = stripes();
        let forest = RandomForest::fit(&x, &y, 3, params(), 3).expect("valid");
        assert_eq!(forest.trees().len(), 15);
        assert_eq!(forest.predict(&[5.0, 3.0]), 0);
        assert_eq!(forest.predict(&[30.0, 3.0]), 1);
        assert_eq!(forest.predict(&[55.0, 3.0]), 2);
    }

    #[test]
    fn deterministic_for_seed() {
        let (x, y) = stripes();
        let a = RandomForest::fit(&x, &y, 3, params(), 11).expect("valid");
        let b = RandomForest::fit(&x, &y, 3, params(), 11).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(RandomForest::fit(&[], &[], 2, params(), 0).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[3], 2, params(), 0).is_err());
        let p = ForestParams {
            n_trees: 0,
            ..params()
        };
        assert!(RandomForest::fit(&[vec![1.0]], &[0], 1, p, 0).is_err());
    }
}
