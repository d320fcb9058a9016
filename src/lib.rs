mod app;
mod features;
mod labels;
mod model_service;
mod native_service;
mod ort_service;
mod response;

pub mod config;
pub mod error;

pub use app::{predict_once, start_app};
pub use error::PredictorError;
pub use labels::LabelMap;
pub use model_service::{load_model, ModelService};
pub use native_service::{NativeModel, NativeModelService};
pub use response::{PredictionValue, Response};
