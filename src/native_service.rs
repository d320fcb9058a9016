//! Classifiers described directly in JSON by the training side.
//!
//! Trees follow the flattened node layout used by scikit-learn: leaves have
//! `children_left == children_right == -1` and a sample goes left when
//! `x[feature] <= threshold`.

use crate::{
    config::{ModelConfig, Validatable},
    error::PredictorError,
    model_service::ModelService,
};
use ndarray::{Array2, ArrayView1};
use serde::Deserialize;
use std::fs;

const TREE_LEAF: i64 = -1;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeModel {
    Linear(LinearModel),
    DecisionTree(TreeModel),
    RandomForest(ForestModel),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub n_features: usize,
    pub classes: Vec<i64>,
    /// One row per class, or a single row for binary models.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeModel {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub tree: Tree,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestModel {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl Tree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n_nodes = self.children_left.len();
        if n_nodes == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n_nodes
            || self.feature.len() != n_nodes
            || self.threshold.len() != n_nodes
            || self.value.len() != n_nodes
        {
            return Err(format!(
                "tree node arrays disagree in length (expected {} nodes)",
                n_nodes
            ));
        }

        for node in 0..n_nodes {
            if self.value[node].len() != n_classes {
                return Err(format!(
                    "node {} holds {} class values, expected {}",
                    node,
                    self.value[node].len(),
                    n_classes
                ));
            }

            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == TREE_LEAF && right == TREE_LEAF {
                continue;
            }

            // Children are stored after their parent, so traversal always terminates.
            for child in [left, right] {
                if child <= node as i64 || child >= n_nodes as i64 {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }
            if usize::try_from(self.feature[node]).map_or(true, |feature| feature >= n_features) {
                return Err(format!(
                    "node {} splits on feature {} of {}",
                    node, self.feature[node], n_features
                ));
            }
        }

        Ok(())
    }

    fn leaf_values(&self, sample: ArrayView1<f64>) -> &[f64] {
        let mut node = 0;
        while self.children_left[node] != TREE_LEAF {
            let feature = self.feature[node] as usize;
            node = if sample[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        &self.value[node]
    }
}

/// Position of the largest score, ignoring NaN entries.
fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (position, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            tracing::debug!("Ignoring NaN score for class position {}", position);
            continue;
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((position, score)),
        }
    }
    best.map(|(position, _)| position)
}

impl NativeModel {
    pub fn n_features(&self) -> usize {
        match self {
            NativeModel::Linear(model) => model.n_features,
            NativeModel::DecisionTree(model) => model.n_features,
            NativeModel::RandomForest(model) => model.n_features,
        }
    }

    fn classes(&self) -> &[i64] {
        match self {
            NativeModel::Linear(model) => &model.classes,
            NativeModel::DecisionTree(model) => &model.classes,
            NativeModel::RandomForest(model) => &model.classes,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let n_classes = self.classes().len();
        if n_classes == 0 {
            return Err("model declares no classes".to_string());
        }

        match self {
            NativeModel::Linear(model) => {
                let expected_rows = if n_classes == 2 { 1 } else { n_classes };
                if model.coefficients.len() != expected_rows
                    || model.intercepts.len() != expected_rows
                {
                    return Err(format!(
                        "linear model with {} classes needs {} coefficient rows and intercepts, got {} and {}",
                        n_classes,
                        expected_rows,
                        model.coefficients.len(),
                        model.intercepts.len()
                    ));
                }
                if let Some(row) = model
                    .coefficients
                    .iter()
                    .find(|row| row.len() != model.n_features)
                {
                    return Err(format!(
                        "coefficient row has {} entries, expected {}",
                        row.len(),
                        model.n_features
                    ));
                }
                Ok(())
            }
            NativeModel::DecisionTree(model) => model.tree.validate(model.n_features, n_classes),
            NativeModel::RandomForest(model) => {
                if model.trees.is_empty() {
                    return Err("forest has no trees".to_string());
                }
                model
                    .trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, tree)| {
                        tree.validate(model.n_features, n_classes)
                            .map_err(|e| format!("tree {}: {}", index, e))
                    })
            }
        }
    }

    fn class_position(&self, sample: ArrayView1<f64>) -> Option<usize> {
        match self {
            NativeModel::Linear(model) => {
                let scores: Vec<f64> = model
                    .coefficients
                    .iter()
                    .zip(&model.intercepts)
                    .map(|(row, intercept)| {
                        row.iter().zip(sample.iter()).map(|(w, x)| w * x).sum::<f64>() + intercept
                    })
                    .collect();

                if model.classes.len() == 2 {
                    if scores[0].is_nan() {
                        tracing::debug!("Decision score is NaN, falling back to the first class");
                    }
                    Some(usize::from(scores[0] > 0.0))
                } else {
                    argmax(&scores)
                }
            }
            NativeModel::DecisionTree(model) => argmax(model.tree.leaf_values(sample)),
            NativeModel::RandomForest(model) => {
                let mut probabilities = vec![0.0; model.classes.len()];
                for (index, tree) in model.trees.iter().enumerate() {
                    let leaf = tree.leaf_values(sample);
                    let total: f64 = leaf.iter().sum();
                    if !(total.is_finite() && total > 0.0) {
                        tracing::debug!("Skipping tree {} with empty leaf", index);
                        continue;
                    }
                    for (probability, value) in probabilities.iter_mut().zip(leaf) {
                        *probability += value / total;
                    }
                }
                let n_trees = model.trees.len() as f64;
                probabilities.iter_mut().for_each(|p| *p /= n_trees);
                argmax(&probabilities)
            }
        }
    }

    pub fn predict(&self, sample: &Array2<f64>) -> Result<i64, PredictorError> {
        if sample.nrows() != 1 {
            return Err(PredictorError::prediction(format!(
                "expected a single sample, got {}",
                sample.nrows()
            )));
        }
        if sample.ncols() != self.n_features() {
            return Err(PredictorError::prediction(format!(
                "X has {} features, but the model is expecting {} features as input",
                sample.ncols(),
                self.n_features()
            )));
        }

        let position = self
            .class_position(sample.row(0))
            .ok_or_else(|| PredictorError::prediction("no finite class score"))?;

        Ok(self.classes()[position])
    }
}

pub struct NativeModelService {
    model: NativeModel,
}

impl NativeModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, PredictorError> {
        let raw = fs::read_to_string(model_config.get_path()).map_err(PredictorError::model_load)?;
        let model: NativeModel = serde_json::from_str(&raw).map_err(PredictorError::model_load)?;
        model.validate().map_err(PredictorError::model_load)?;

        tracing::info!(
            "Loaded native model with {} features and {} classes",
            model.n_features(),
            model.classes().len()
        );

        Ok(Self { model })
    }

    pub fn from_model(model: NativeModel) -> Result<Self, PredictorError> {
        model.validate().map_err(PredictorError::model_load)?;
        Ok(Self { model })
    }
}

impl ModelService for NativeModelService {
    fn expected_features(&self) -> Option<usize> {
        Some(self.model.n_features())
    }

    fn predict(&mut self, sample: &Array2<f64>) -> Result<i64, PredictorError> {
        self.model.predict(sample)
    }
}
