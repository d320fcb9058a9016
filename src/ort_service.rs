use crate::{
    config::{ModelConfig, Validatable},
    error::PredictorError,
    model_service::ModelService,
};
use ndarray::Array2;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    tensor::TensorElementType,
    value::{TensorRef, ValueType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputPrecision {
    Float32,
    Float64,
}

/// Classifier exported to ONNX, e.g. a scikit-learn estimator converted with skl2onnx.
pub struct OrtModelService {
    session: Session,
    precision: InputPrecision,
    expected_features: Option<usize>,
    label_output: String,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, PredictorError> {
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(model_config.get_path()))
            .map_err(PredictorError::model_load)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| PredictorError::model_load("model declares no inputs"))?;

        let (precision, expected_features) = match &input.input_type {
            ValueType::Tensor { ty, shape, .. } => {
                let precision = match ty {
                    TensorElementType::Float32 => InputPrecision::Float32,
                    TensorElementType::Float64 => InputPrecision::Float64,
                    other => {
                        return Err(PredictorError::model_load(format!(
                            "unsupported input element type {:?} for `{}`",
                            other, input.name
                        )))
                    }
                };
                let width = shape
                    .get(1)
                    .and_then(|&dim| usize::try_from(dim).ok())
                    .filter(|&dim| dim > 0);
                (precision, width)
            }
            other => {
                return Err(PredictorError::model_load(format!(
                    "input `{}` is not a tensor: {:?}",
                    input.name, other
                )))
            }
        };

        tracing::info!(
            "Created ONNX session with input `{}` ({:?}, width {:?})",
            input.name,
            precision,
            expected_features
        );

        Ok(Self {
            session,
            precision,
            expected_features,
            label_output: model_config.label_output.clone(),
        })
    }

    fn run_inference(&mut self, sample: &Array2<f64>) -> Result<i64, PredictorError> {
        let outputs = match self.precision {
            InputPrecision::Float32 => {
                let input = sample.mapv(|value| value as f32);
                let tensor_ref = TensorRef::from_array_view(input.view())
                    .map_err(|e| {
                        PredictorError::prediction(format!("failed to build tensor: {}", e))
                    })?;
                self.session.run(ort::inputs![tensor_ref])
            }
            InputPrecision::Float64 => {
                let input = sample.as_standard_layout();
                let tensor_ref = TensorRef::from_array_view(input.view())
                    .map_err(|e| {
                        PredictorError::prediction(format!("failed to build tensor: {}", e))
                    })?;
                self.session.run(ort::inputs![tensor_ref])
            }
        }
        .map_err(|e| PredictorError::prediction(format!("inference failed: {}", e)))?;

        let label = outputs.get(self.label_output.as_str()).ok_or_else(|| {
            PredictorError::prediction(format!(
                "model has no output named `{}`",
                self.label_output
            ))
        })?;

        let (_, data) = label.try_extract_tensor::<i64>().map_err(|e| {
            PredictorError::prediction(format!("failed to extract class index: {}", e))
        })?;

        data.first()
            .copied()
            .ok_or_else(|| PredictorError::prediction("model returned an empty label tensor"))
    }
}

impl ModelService for OrtModelService {
    fn expected_features(&self) -> Option<usize> {
        self.expected_features
    }

    fn predict(&mut self, sample: &Array2<f64>) -> Result<i64, PredictorError> {
        let class_id = self.run_inference(sample)?;
        tracing::debug!("ONNX session predicted class {}", class_id);
        Ok(class_id)
    }
}
