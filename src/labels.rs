use crate::{config::LabelsConfig, response::PredictionValue};
use std::collections::BTreeMap;

/// Horse outcome classes as encoded by the training pipeline.
pub const DEFAULT_LABELS: [(i64, &str); 3] = [(0, "died"), (1, "euthanized"), (2, "lived")];

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<i64, String>,
}

impl LabelMap {
    pub fn new(labels: BTreeMap<i64, String>) -> Self {
        Self { labels }
    }

    /// `None` when labelling is switched off and raw class indices are emitted.
    pub fn from_config(labels_cfg: &LabelsConfig) -> Result<Option<Self>, config::ConfigError> {
        if !labels_cfg.enabled {
            return Ok(None);
        }

        let labels = labels_cfg
            .mapping
            .iter()
            .map(|(class, label)| {
                let class: i64 = class.trim().parse().map_err(|_| {
                    config::ConfigError::Message(format!(
                        "label key `{}` is not an integer class index",
                        class
                    ))
                })?;
                Ok((class, label.clone()))
            })
            .collect::<Result<BTreeMap<_, _>, config::ConfigError>>()?;

        Ok(Some(Self::new(labels)))
    }

    pub fn get_label(&self, class_id: i64) -> &str {
        self.labels
            .get(&class_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn resolve(&self, class_id: i64) -> PredictionValue {
        PredictionValue::Label(self.get_label(class_id).to_string())
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::new(
            DEFAULT_LABELS
                .iter()
                .map(|(class, label)| (*class, label.to_string()))
                .collect(),
        )
    }
}
