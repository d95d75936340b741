use serde::Deserialize;

const DEFAULT_BATCH_NORM_EPS: f32 = 1e-5;

/// One layer of the exported feed-forward network.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    /// `weight` is `[out][in]`.
    Linear { weight: Vec<Vec<f32>>, bias: Vec<f32> },
    /// Inference-mode batch normalization using running statistics.
    BatchNorm {
        weight: Vec<f32>,
        bias: Vec<f32>,
        running_mean: Vec<f32>,
        running_var: Vec<f32>,
        #[serde(default = "default_eps")]
        eps: f32,
    },
    Relu,
    Sigmoid,
}

fn default_eps() -> f32 {
    DEFAULT_BATCH_NORM_EPS
}

#[derive(Deserialize)]
struct ModelFile {
    layers: Vec<Layer>,
}

/// Trained binary fraud classifier.
#[derive(Debug, Clone)]
pub struct BinaryClassifier {
    layers: Vec<Layer>,
    input_width: usize,
}

impl BinaryClassifier {
    /// Parse an exported model (`{"layers": [...]}`) and check its shapes chain
    /// from the input width down to a single output.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_slice(bytes)?;
        Self::new(file.layers)
    }

    pub fn new(layers: Vec<Layer>) -> Result<Self, ModelError> {
        let input_width = match layers.first() {
            Some(Layer::Linear { weight, .. }) => {
                weight.first().map(Vec::len).ok_or(ModelError::Shape(
                    "first linear layer has no rows".to_string(),
                ))?
            }
            Some(_) => return Err(ModelError::Shape("first layer must be linear".to_string())),
            None => return Err(ModelError::Shape("model has no layers".to_string())),
        };

        let mut width = input_width;
        for (i, layer) in layers.iter().enumerate() {
            match layer {
                Layer::Linear { weight, bias } => {
                    if weight.iter().any(|row| row.len() != width) {
                        return Err(ModelError::Shape(format!(
                            "layer {i}: linear expects {width} inputs per row"
                        )));
                    }
                    if bias.len() != weight.len() {
                        return Err(ModelError::Shape(format!(
                            "layer {i}: bias has {} entries for {} outputs",
                            bias.len(),
                            weight.len()
                        )));
                    }
                    width = weight.len();
                }
                Layer::BatchNorm {
                    weight,
                    bias,
                    running_mean,
                    running_var,
                    ..
                } => {
                    if [weight.len(), bias.len(), running_mean.len(), running_var.len()]
                        .iter()
                        .any(|&len| len != width)
                    {
                        return Err(ModelError::Shape(format!(
                            "layer {i}: batch norm parameters must have {width} entries"
                        )));
                    }
                }
                Layer::Relu | Layer::Sigmoid => {}
            }
        }

        if width != 1 {
            return Err(ModelError::Shape(format!(
                "model must produce one output, produces {width}"
            )));
        }
        Ok(Self {
            layers,
            input_width,
        })
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// Fraud probability for one normalized feature row.
    pub fn score(&self, row: &[f32]) -> Result<f32, ModelError> {
        if row.len() != self.input_width {
            return Err(ModelError::Input {
                expected: self.input_width,
                actual: row.len(),
            });
        }

        let mut x = row.to_vec();
        for layer in &self.layers {
            x = match layer {
                Layer::Linear { weight, bias } => weight
                    .iter()
                    .zip(bias)
                    .map(|(w, b)| w.iter().zip(&x).map(|(wi, v)| wi * v).sum::<f32>() + b)
                    .collect(),
                Layer::BatchNorm {
                    weight,
                    bias,
                    running_mean,
                    running_var,
                    eps,
                } => x
                    .iter()
                    .enumerate()
                    .map(|(j, v)| {
                        (v - running_mean[j]) / (running_var[j] + eps).sqrt() * weight[j] + bias[j]
                    })
                    .collect(),
                Layer::Relu => x.into_iter().map(|v| v.max(0.0)).collect(),
                Layer::Sigmoid => x.into_iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect(),
            };
        }
        Ok(x[0])
    }

    /// 1 when the score is strictly above one half, else 0.
    pub fn predict(&self, row: &[f32]) -> Result<u8, ModelError> {
        Ok(u8::from(self.score(row)? > 0.5))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model shape error: {0}")]
    Shape(String),

    #[error("Model expects {expected} features, got {actual}")]
    Input { expected: usize, actual: usize },
}
