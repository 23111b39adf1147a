use std::{fs, path::Path};

use serde::Deserialize;

use crate::{error::EstimatorError, features::FeatureVector};

/// A pre-trained model reduced to a pure function of its input row.
pub trait Predictor: Send + Sync {
    /// feature names, in the order `predict` expects its input
    fn feature_names(&self) -> &[String];

    fn predict(&self, x: &[f64]) -> Result<f64, String>;
}

/// One regression tree, stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[feature] <= threshold` continues at `left`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

impl Tree {
    fn evaluate(&self, x: &[f64]) -> Result<f64, String> {
        let mut idx = 0;
        // a well-formed tree reaches a leaf in fewer hops than it has nodes
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { leaf }) => return Ok(*leaf),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x
                        .get(*feature)
                        .ok_or_else(|| format!("split on missing feature index {feature}"))?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                None => return Err(format!("node index {idx} out of range")),
            }
        }
        Err(String::from("tree contains a cycle"))
    }
}

/// Serialized model artifact. `feat_list` is the authoritative input order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ModelArtifact {
    /// intercept + coefficients · x
    Linear {
        feat_list: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// binary classifier; emits label 1 when sigmoid(score) >= threshold, else 0
    Logistic {
        feat_list: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// gradient-boosted regression trees: base_score + sum of tree outputs
    TreeEnsemble {
        feat_list: Vec<String>,
        #[serde(default)]
        base_score: f64,
        trees: Vec<Tree>,
    },
}

fn default_threshold() -> f64 {
    0.5
}

fn linear_score(coefficients: &[f64], intercept: f64, x: &[f64]) -> f64 {
    intercept + coefficients.iter().zip(x).map(|(c, v)| c * v).sum::<f64>()
}

impl ModelArtifact {
    pub fn from_path(path: &Path) -> Result<Self, EstimatorError> {
        let txt = fs::read_to_string(path).map_err(|e| EstimatorError::from_io(path, e))?;
        let artifact: ModelArtifact =
            serde_json::from_str(&txt).map_err(|e| EstimatorError::ReadError {
                filepath: path.display().to_string(),
                error: e.to_string(),
            })?;
        artifact
            .validate()
            .map_err(|error| EstimatorError::InvalidModel {
                filepath: path.display().to_string(),
                error,
            })?;
        Ok(artifact)
    }

    /// checks the artifact is internally consistent before it is ever evaluated
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelArtifact::Linear {
                feat_list,
                coefficients,
                ..
            }
            | ModelArtifact::Logistic {
                feat_list,
                coefficients,
                ..
            } => {
                if coefficients.len() != feat_list.len() {
                    return Err(format!(
                        "{} coefficients for {} features",
                        coefficients.len(),
                        feat_list.len()
                    ));
                }
            }
            ModelArtifact::TreeEnsemble {
                feat_list, trees, ..
            } => {
                for (t, tree) in trees.iter().enumerate() {
                    if tree.nodes.is_empty() {
                        return Err(format!("tree {t} has no nodes"));
                    }
                    for (n, node) in tree.nodes.iter().enumerate() {
                        if let TreeNode::Split {
                            feature,
                            left,
                            right,
                            ..
                        } = node
                        {
                            if *feature >= feat_list.len() {
                                return Err(format!(
                                    "tree {t} node {n} splits on feature {feature}, only {} features",
                                    feat_list.len()
                                ));
                            }
                            if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                                return Err(format!("tree {t} node {n} has a child out of range"));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Predictor for ModelArtifact {
    fn feature_names(&self) -> &[String] {
        match self {
            ModelArtifact::Linear { feat_list, .. }
            | ModelArtifact::Logistic { feat_list, .. }
            | ModelArtifact::TreeEnsemble { feat_list, .. } => feat_list,
        }
    }

    fn predict(&self, x: &[f64]) -> Result<f64, String> {
        let in_dim = self.feature_names().len();
        if x.len() != in_dim {
            return Err(format!(
                "feature length mismatch: got {}, expected {}",
                x.len(),
                in_dim
            ));
        }
        match self {
            ModelArtifact::Linear {
                coefficients,
                intercept,
                ..
            } => Ok(linear_score(coefficients, *intercept, x)),
            ModelArtifact::Logistic {
                coefficients,
                intercept,
                threshold,
                ..
            } => {
                let score = linear_score(coefficients, *intercept, x);
                let p = 1.0 / (1.0 + (-score).exp());
                Ok(if p >= *threshold { 1.0 } else { 0.0 })
            }
            ModelArtifact::TreeEnsemble {
                base_score, trees, ..
            } => trees
                .iter()
                .try_fold(*base_score, |acc, t| t.evaluate(x).map(|y| acc + y)),
        }
    }
}

#[cfg(feature = "torch")]
pub mod torchscript {
    use std::{fs, path::Path};

    use serde::Deserialize;
    use tch::{kind::Kind, CModule, Device, Tensor};

    use super::Predictor;
    use crate::error::EstimatorError;

    #[derive(Deserialize)]
    struct MetaJson {
        feat_list: Vec<String>,
    }

    /// TorchScript regressor producing a `[1, 1]` output per row
    pub struct TorchScriptModel {
        model: CModule,
        device: Device,
        feat_list: Vec<String>,
    }

    impl TorchScriptModel {
        pub fn new(model_path: &Path, meta_path: &Path) -> Result<Self, EstimatorError> {
            let device = Device::Cpu;

            let meta_txt = fs::read_to_string(meta_path)
                .map_err(|e| EstimatorError::from_io(meta_path, e))?;
            let meta: MetaJson =
                serde_json::from_str(&meta_txt).map_err(|e| EstimatorError::ReadError {
                    filepath: meta_path.display().to_string(),
                    error: e.to_string(),
                })?;

            if !model_path.exists() {
                return Err(EstimatorError::MissingResource {
                    filepath: model_path.display().to_string(),
                });
            }
            let model = CModule::load_on_device(model_path, device).map_err(|e| {
                EstimatorError::ReadError {
                    filepath: model_path.display().to_string(),
                    error: e.to_string(),
                }
            })?;

            let invalid = |error: String| EstimatorError::InvalidModel {
                filepath: model_path.display().to_string(),
                error,
            };
            // probe the output shape with a dummy forward
            let in_dim = meta.feat_list.len() as i64;
            let dummy = Tensor::zeros([1, in_dim], (Kind::Float, device));
            let t = model.forward_ts(&[dummy]).map_err(|e| invalid(e.to_string()))?;
            let sz = t.size();
            if sz != [1, 1] {
                return Err(invalid(format!("unexpected model output size: {:?}", sz)));
            }

            Ok(Self {
                model,
                device,
                feat_list: meta.feat_list,
            })
        }
    }

    impl Predictor for TorchScriptModel {
        fn feature_names(&self) -> &[String] {
            &self.feat_list
        }

        fn predict(&self, x: &[f64]) -> Result<f64, String> {
            let row: Vec<f32> = x.iter().map(|v| *v as f32).collect();
            let input = Tensor::from_slice(&row)
                .reshape([1, row.len() as i64])
                .to_device(self.device);
            let t = self.model.forward_ts(&[input]).map_err(|e| e.to_string())?;
            Ok(t.double_value(&[0, 0]))
        }
    }
}

/// A predictor bound to the role it plays in the estimate.
pub struct Model {
    name: String,
    predictor: Box<dyn Predictor>,
}

impl Model {
    pub fn new(name: impl Into<String>, predictor: Box<dyn Predictor>) -> Self {
        Self {
            name: name.into(),
            predictor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_names(&self) -> &[String] {
        self.predictor.feature_names()
    }

    /// fails with SchemaMismatch unless `schema` is exactly the predictor's
    /// declared input, same names in the same order
    pub fn check_schema(&self, schema: &[&str]) -> Result<(), EstimatorError> {
        let declared = self.predictor.feature_names();
        let matches = declared.len() == schema.len()
            && declared.iter().zip(schema).all(|(d, s)| d == s);
        if matches {
            Ok(())
        } else {
            Err(EstimatorError::SchemaMismatch {
                model: self.name.clone(),
                expected: declared.to_vec(),
                actual: schema.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        self.check_schema(features.names())?;
        let y = self
            .predictor
            .predict(features.values())
            .map_err(|error| EstimatorError::PredictionFailed {
                model: self.name.clone(),
                error,
            })?;
        tracing::debug!("{} model: {} features -> {:.4}", self.name, features.len(), y);
        Ok(y)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("feat_list", &self.predictor.feature_names())
            .finish()
    }
}
