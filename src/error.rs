use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Model file not found at {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("Error loading model: {0}")]
    ModelLoad(String),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Prediction error: {0}")]
    Prediction(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl PredictorError {
    pub fn input(reason: impl ToString) -> Self {
        Self::Input(reason.to_string())
    }

    pub fn prediction(reason: impl ToString) -> Self {
        Self::Prediction(reason.to_string())
    }

    pub fn model_load(reason: impl ToString) -> Self {
        Self::ModelLoad(reason.to_string())
    }
}
