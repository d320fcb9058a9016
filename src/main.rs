use outcome_prediction::{config, start_app, PredictorError, Response};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(log_level: &config::LogLevel) {
    let log_level = format!("{},ort=error", log_level.as_str());

    // stdout carries the prediction document, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let result = config::get_configuration()
        .map_err(PredictorError::from)
        .and_then(|config| {
            init_tracing(&config.log_level);
            start_app(&config, std::io::stdin().lock())
        });

    if let Err(err) = &result {
        tracing::error!("{}", err);
    }

    let response = Response::from(result);
    if let Err(err) = response.write_to(std::io::stdout().lock()) {
        tracing::error!("Failed to write response: {}", err);
        return ExitCode::FAILURE;
    }

    if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
