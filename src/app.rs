use crate::{
    config::{Config, InputConfig},
    error::PredictorError,
    features::read_request,
    labels::LabelMap,
    model_service::{load_model, ModelService},
    response::PredictionValue,
};
use std::io::Read;

/// Runs one prediction: model first, then the request, then inference.
pub fn start_app<R: Read>(config: &Config, reader: R) -> Result<PredictionValue, PredictorError> {
    let labels = LabelMap::from_config(&config.labels)?;
    let mut model = load_model(&config.model)?;

    predict_once(model.as_mut(), reader, &config.input, labels.as_ref())
}

pub fn predict_once<M, R>(
    model: &mut M,
    reader: R,
    input_cfg: &InputConfig,
    labels: Option<&LabelMap>,
) -> Result<PredictionValue, PredictorError>
where
    M: ModelService + ?Sized,
    R: Read,
{
    let request = read_request(reader)?;
    let expected = input_cfg.resolve_expected_features(model.expected_features());
    request.check_feature_count(expected)?;

    let sample = request.into_sample()?;
    tracing::debug!("Running inference on {} features", sample.ncols());

    let class_id = model.predict(&sample)?;
    let prediction = match labels {
        Some(labels) => labels.resolve(class_id),
        None => PredictionValue::Class(class_id),
    };

    tracing::info!("Predicted class {} as {:?}", class_id, prediction);
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::io::Cursor;

    struct MockModelService {
        class_id: i64,
        width: Option<usize>,
        calls: usize,
    }

    impl MockModelService {
        fn new(class_id: i64, width: Option<usize>) -> Self {
            Self {
                class_id,
                width,
                calls: 0,
            }
        }
    }

    impl ModelService for MockModelService {
        fn expected_features(&self) -> Option<usize> {
            self.width
        }

        fn predict(&mut self, sample: &Array2<f64>) -> Result<i64, PredictorError> {
            self.calls += 1;
            assert_eq!(sample.nrows(), 1);
            Ok(self.class_id)
        }
    }

    struct FailingModelService;

    impl ModelService for FailingModelService {
        fn expected_features(&self) -> Option<usize> {
            None
        }

        fn predict(&mut self, sample: &Array2<f64>) -> Result<i64, PredictorError> {
            Err(PredictorError::prediction(format!(
                "cannot reshape {} columns",
                sample.ncols()
            )))
        }
    }

    fn features_payload(count: usize) -> String {
        let features: Vec<String> = (1..=count).map(|i| i.to_string()).collect();
        format!("{{\"features\": [{}]}}", features.join(","))
    }

    fn strict_input(expected: usize) -> InputConfig {
        InputConfig {
            expected_features: Some(expected),
            ..InputConfig::default()
        }
    }

    #[test]
    fn test_labelled_prediction() {
        let mut model = MockModelService::new(2, None);
        let labels = LabelMap::default();

        let prediction = predict_once(
            &mut model,
            Cursor::new(features_payload(27)),
            &strict_input(27),
            Some(&labels),
        )
        .unwrap();

        assert_eq!(prediction, PredictionValue::Label("lived".to_string()));
        assert_eq!(model.calls, 1);
    }

    #[test]
    fn test_unmapped_class_is_unknown() {
        let mut model = MockModelService::new(9, None);
        let labels = LabelMap::default();

        let prediction = predict_once(
            &mut model,
            Cursor::new(features_payload(3)),
            &InputConfig::default(),
            Some(&labels),
        )
        .unwrap();

        assert_eq!(prediction, PredictionValue::Label("Unknown".to_string()));
    }

    #[test]
    fn test_raw_class_without_labels() {
        let mut model = MockModelService::new(1, None);

        let prediction = predict_once(
            &mut model,
            Cursor::new(features_payload(5)),
            &InputConfig::default(),
            None,
        )
        .unwrap();

        assert_eq!(prediction, PredictionValue::Class(1));
    }

    #[test]
    fn test_count_mismatch_never_reaches_the_model() {
        let mut model = MockModelService::new(2, None);

        let err = predict_once(
            &mut model,
            Cursor::new(features_payload(2)),
            &strict_input(27),
            None,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Input error: Expected 27 features, got 2");
        assert_eq!(model.calls, 0);
    }

    #[test]
    fn test_model_width_is_checked_when_not_configured() {
        let mut model = MockModelService::new(2, Some(4));

        let err = predict_once(
            &mut model,
            Cursor::new(features_payload(3)),
            &InputConfig::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Input error: Expected 4 features, got 3");

        let relaxed = InputConfig {
            strict_feature_count: false,
            ..InputConfig::default()
        };
        assert!(predict_once(&mut model, Cursor::new(features_payload(3)), &relaxed, None).is_ok());
        assert_eq!(model.calls, 1);
    }

    #[test]
    fn test_bad_input_never_reaches_the_model() {
        for input in ["", "not json", "{\"features\": \"1,2\"}", "{\"features\": [1, null]}"] {
            let mut model = MockModelService::new(0, None);
            let result = predict_once(&mut model, Cursor::new(input), &InputConfig::default(), None);

            assert!(matches!(result, Err(PredictorError::Input(_))), "{}", input);
            assert_eq!(model.calls, 0);
        }
    }

    #[test]
    fn test_model_failure_is_a_prediction_error() {
        let err = predict_once(
            &mut FailingModelService,
            Cursor::new(features_payload(2)),
            &InputConfig::default(),
            None,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Prediction error: cannot reshape 2 columns");
    }

    #[test]
    fn test_missing_model_is_reported_before_input() {
        let mut config = Config::default();
        config.model.model_dir = "/nonexistent".into();

        let err = start_app(&config, Cursor::new(features_payload(27))).unwrap_err();
        assert!(matches!(err, PredictorError::ModelNotFound(_)));

        let err = start_app(&config, Cursor::new("")).unwrap_err();
        assert!(matches!(err, PredictorError::ModelNotFound(_)));
    }
}
