use crate::error::PredictorError;
use ndarray::Array2;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;

#[derive(Debug, Deserialize)]
pub struct PredictionRequest {
    pub features: Vec<Value>,
}

pub fn read_request<R: Read>(mut reader: R) -> Result<PredictionRequest, PredictorError> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .map_err(|e| PredictorError::input(format!("Failed to read standard input: {}", e)))?;

    parse_request(&input)
}

pub fn parse_request(input: &str) -> Result<PredictionRequest, PredictorError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PredictorError::input("No input data received"));
    }

    let document: Value = serde_json::from_str(input).map_err(PredictorError::input)?;
    // Derived struct impls also accept a positional array, which has no `features` key.
    if !document.is_object() {
        return Err(PredictorError::input(format!(
            "expected a JSON object with a `features` field, got {}",
            document
        )));
    }

    serde_json::from_value(document).map_err(PredictorError::input)
}

impl PredictionRequest {
    pub fn check_feature_count(&self, expected: Option<usize>) -> Result<(), PredictorError> {
        match expected {
            Some(expected) if expected != self.features.len() => Err(PredictorError::input(
                format!("Expected {} features, got {}", expected, self.features.len()),
            )),
            _ => Ok(()),
        }
    }

    /// One sample, one column per feature.
    pub fn into_sample(self) -> Result<Array2<f64>, PredictorError> {
        let values = self
            .features
            .iter()
            .enumerate()
            .map(|(position, value)| {
                value.as_f64().ok_or_else(|| {
                    PredictorError::input(format!(
                        "Feature at position {} is not numeric: {}",
                        position, value
                    ))
                })
            })
            .collect::<Result<Vec<f64>, PredictorError>>()?;

        let width = values.len();
        Array2::from_shape_vec((1, width), values).map_err(PredictorError::input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_input_is_rejected() {
        for input in ["", "   \n\t"] {
            match read_request(Cursor::new(input)) {
                Err(PredictorError::Input(reason)) => assert_eq!(reason, "No input data received"),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_malformed_json_and_missing_key() {
        assert!(matches!(
            parse_request("{\"features\": [1, 2"),
            Err(PredictorError::Input(_))
        ));

        match parse_request("{\"values\": [1, 2]}") {
            Err(PredictorError::Input(reason)) => assert!(reason.contains("features")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        for input in ["[[1, 2]]", "[1, 2]", "42", "\"features\""] {
            match parse_request(input) {
                Err(PredictorError::Input(reason)) => {
                    assert!(reason.contains("`features`"), "{}: {}", input, reason)
                }
                other => panic!("{} was accepted: {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_feature_count_mismatch_reports_both_counts() {
        let request = parse_request("{\"features\": [1, 2]}").unwrap();

        let err = request.check_feature_count(Some(27)).unwrap_err();
        assert_eq!(err.to_string(), "Input error: Expected 27 features, got 2");

        assert!(request.check_feature_count(Some(2)).is_ok());
        assert!(request.check_feature_count(None).is_ok());
    }

    #[test]
    fn test_into_sample_reshapes_to_single_row() {
        let request = parse_request("{\"features\": [1, 2.5, -3, 4e2]}").unwrap();
        let sample = request.into_sample().unwrap();

        assert_eq!(sample.shape(), &[1, 4]);
        assert_eq!(sample.row(0).to_vec(), vec![1.0, 2.5, -3.0, 400.0]);
    }

    #[test]
    fn test_non_numeric_feature_is_rejected() {
        let request = parse_request("{\"features\": [1, \"two\", 3]}").unwrap();

        match request.into_sample() {
            Err(PredictorError::Input(reason)) => {
                assert_eq!(reason, "Feature at position 1 is not numeric: \"two\"")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
