use crate::error::PredictorError;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PredictionValue {
    Class(i64),
    Label(String),
}

/// The single document written to stdout.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Prediction { prediction: PredictionValue },
    Error { error: String },
}

impl From<Result<PredictionValue, PredictorError>> for Response {
    fn from(result: Result<PredictionValue, PredictorError>) -> Self {
        match result {
            Ok(prediction) => Response::Prediction { prediction },
            Err(err) => Response::Error {
                error: err.to_string(),
            },
        }
    }
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()
    }
}
