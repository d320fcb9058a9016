use crate::{error::PredictorError, labels::DEFAULT_LABELS};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

fn deserialize_model_format<'de, D>(deserializer: D) -> Result<Option<ModelFormat>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(ModelFormat::try_from)
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub trait Validatable {
    fn get_path(&self) -> PathBuf;

    fn validate(&self) -> Result<(), PredictorError> {
        let path = self.get_path();
        if !path.is_file() {
            return Err(PredictorError::ModelNotFound(path));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default, deserialize_with = "deserialize_model_format")]
    pub format: Option<ModelFormat>,
    #[serde(default = "default_label_output")]
    pub label_output: String,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_model_file() -> String {
    "model.onnx".to_string()
}

fn default_label_output() -> String {
    "output_label".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            model_file: default_model_file(),
            format: None,
            label_output: default_label_output(),
        }
    }
}

impl Validatable for ModelConfig {
    fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }
}

impl ModelConfig {
    /// Declared format, falling back to the model file's extension.
    pub fn get_format(&self) -> Result<ModelFormat, PredictorError> {
        if let Some(format) = self.format {
            return Ok(format);
        }

        let path = self.get_path();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        ModelFormat::try_from(extension.to_string()).map_err(|_| {
            PredictorError::model_load(format!(
                "cannot infer model format from {:?}, set `model.format` to `onnx` or `json`",
                path
            ))
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub expected_features: Option<usize>,
    #[serde(default = "default_strict_feature_count")]
    pub strict_feature_count: bool,
}

fn default_strict_feature_count() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            expected_features: None,
            strict_feature_count: default_strict_feature_count(),
        }
    }
}

impl InputConfig {
    /// Configured width wins over the width the model declares.
    pub fn resolve_expected_features(&self, model_width: Option<usize>) -> Option<usize> {
        if !self.strict_feature_count {
            return None;
        }
        self.expected_features.or(model_width)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    #[serde(default = "default_labels_enabled")]
    pub enabled: bool,
    #[serde(default = "default_label_mapping")]
    pub mapping: BTreeMap<String, String>,
}

fn default_labels_enabled() -> bool {
    true
}

fn default_label_mapping() -> BTreeMap<String, String> {
    DEFAULT_LABELS
        .iter()
        .map(|(class, label)| (class.to_string(), label.to_string()))
        .collect()
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            enabled: default_labels_enabled(),
            mapping: default_label_mapping(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Onnx,
    Json,
}

impl ModelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Onnx => "onnx",
            ModelFormat::Json => "json",
        }
    }
}

impl TryFrom<String> for ModelFormat {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "{} is not a supported model format. Use either `onnx` or `json`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "{} is not a supported minimum log level. Use one of `debug`, `info`, `warn` or `error`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    build_configuration(&configuration_directory, &environment)
}

pub fn build_configuration(
    configuration_directory: &Path,
    environment: &Environment,
) -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(false))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("PREDICT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize::<Config>()
}
