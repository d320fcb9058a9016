use crate::{
    config::{ModelConfig, ModelFormat, Validatable},
    error::PredictorError,
    native_service::NativeModelService,
    ort_service::OrtModelService,
};
use ndarray::Array2;

pub trait ModelService {
    /// Input width the artifact itself declares, if it is static.
    fn expected_features(&self) -> Option<usize>;

    /// Class index for a single-row sample.
    fn predict(&mut self, sample: &Array2<f64>) -> Result<i64, PredictorError>;
}

pub fn load_model(model_cfg: &ModelConfig) -> Result<Box<dyn ModelService>, PredictorError> {
    model_cfg.validate()?;
    let format = model_cfg.get_format()?;
    tracing::debug!(
        "Loading {} model from {:?}",
        format.as_str(),
        model_cfg.get_path()
    );

    let model: Box<dyn ModelService> = match format {
        ModelFormat::Onnx => Box::new(OrtModelService::new(model_cfg)?),
        ModelFormat::Json => Box::new(NativeModelService::new(model_cfg)?),
    };

    Ok(model)
}
