//! Setup logging subsystem.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::config;

/// Contains guards necessary for logging
#[derive(Debug)]
pub struct TelemetryGuard {
    _log_guards: Vec<WorkerGuard>,
}

/// Setup logging sub-system specifying the logging configuration, service (binary) name, and a
/// list of external crates for which a more verbose logging must be enabled.
///
/// # Panics
///
/// Panics if the global tracing subscriber has already been installed.
pub fn setup(
    config: &config::Log,
    service_name: &str,
    crates_to_filter: impl AsRef<[&'static str]>,
) -> TelemetryGuard {
    let mut guards = Vec::new();
    let mut subscriber_layers = Vec::new();

    if config.console.enabled {
        let directive = config.console.filtering_directive.clone().unwrap_or_else(|| {
            get_envfilter_directive(
                tracing::Level::WARN,
                config.console.level.into_level(),
                crates_to_filter.as_ref(),
            )
        });
        let filter = EnvFilter::builder().parse_lossy(directive);

        let layer = match config.console.log_format {
            config::LogFormat::Default => tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::uptime())
                .with_filter(filter)
                .boxed(),
            config::LogFormat::Json => {
                // Disable color or emphasis related ANSI escape codes for JSON formats
                error_stack::Report::set_color_mode(error_stack::fmt::ColorMode::None);

                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_filter(filter)
                    .boxed()
            }
        };
        subscriber_layers.push(layer);
    }

    if let Some(file_config) = &config.file {
        let directive = file_config.filtering_directive.clone().unwrap_or_else(|| {
            get_envfilter_directive(
                tracing::Level::WARN,
                file_config.level.into_level(),
                crates_to_filter.as_ref(),
            )
        });
        let filter = EnvFilter::builder().parse_lossy(directive);

        let appender = tracing_appender::rolling::daily(&file_config.path, &file_config.file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);

        subscriber_layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(subscriber_layers)
        .init();

    tracing::info!(
        service_name,
        build_version = crate::version!(),
        "Logging subsystem initialized"
    );

    TelemetryGuard {
        _log_guards: guards,
    }
}

fn get_envfilter_directive(
    default_log_level: tracing::Level,
    filter_log_level: tracing::Level,
    crates_to_filter: impl AsRef<[&'static str]>,
) -> String {
    let explicitly_handled_targets = [
        "domain_types",
        "interfaces",
        "connector_integration",
        "external_services",
        "payment_server",
        "checkout",
    ];

    explicitly_handled_targets
        .into_iter()
        .chain(crates_to_filter.as_ref().iter().copied())
        .map(|crate_name| crate_name.replace('-', "_"))
        .fold(vec![default_log_level.to_string()], |mut directives, target| {
            directives.push(format!("{target}={filter_log_level}"));
            directives
        })
        .join(",")
}
