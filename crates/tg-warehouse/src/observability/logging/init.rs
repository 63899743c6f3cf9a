use crate::config::from_env_or_panic;
use crate::observability::GLOBAL_LABELS;
use crate::prelude::*;
use serde::Deserialize;
use serde_with::serde_as;
use std::collections::HashMap;
use std::ops::Deref;
use tracing_subscriber::prelude::*;

/// Handle to the background task that ships logs to Loki, if it is configured
pub struct LoggingTask {
    loki: Option<LokiTask>,
}

struct LokiTask {
    task: tokio::task::JoinHandle<()>,
    controller: tracing_loki::BackgroundTaskController,
}

impl LoggingTask {
    pub async fn shutdown(self) {
        let Some(LokiTask { task, controller }) = self.loki else {
            return;
        };

        info!("Waiting for the logging task to flush the logs...");

        let start = std::time::Instant::now();
        controller.shutdown().await;

        eprintln!(
            "Stopped logging task in {:.2?}: {:?}",
            start.elapsed(),
            task.await
        );
    }
}

/// Initializes the global tracing subscriber. Must be called from within
/// a tokio runtime, because the Loki exporter runs as a background task.
pub fn init_logging() -> LoggingTask {
    LoggingConfig::load_or_panic().init_logging()
}

#[serde_as]
#[derive(Deserialize)]
struct LoggingConfig {
    /// Directives for [`tracing_subscriber::EnvFilter`]
    #[serde(default = "default_warehouse_log")]
    warehouse_log: String,

    #[serde(default)]
    colors: Option<String>,

    #[serde(default)]
    loki_url: Option<url::Url>,

    #[serde_as(as = "Option<serde_with::json::JsonString>")]
    #[serde(default)]
    loki_labels: Option<HashMap<String, String>>,
}

fn default_warehouse_log() -> String {
    "info".to_owned()
}

impl LoggingConfig {
    fn load_or_panic() -> LoggingConfig {
        from_env_or_panic("")
    }

    fn init_logging(self) -> LoggingTask {
        let env_filter = tracing_subscriber::EnvFilter::try_new(&self.warehouse_log)
            .unwrap_or_else(|err| {
                panic!(
                    "BUG: invalid log filter `{}` in WAREHOUSE_LOG: {}",
                    self.warehouse_log,
                    err.display_chain()
                )
            });

        let fmt = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(self.colors.as_deref() != Some("0"))
            .pretty();

        let (loki, loki_task) = match self.loki_url {
            Some(loki_url) => {
                let (layer, task) = init_loki(loki_url, self.loki_labels.unwrap_or_default());
                (Some(layer), Some(task))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(fmt)
            .with(loki)
            .with(env_filter)
            .with(tracing_error::ErrorLayer::default())
            .init();

        init_panic_hook();

        LoggingTask { loki: loki_task }
    }
}

fn init_loki(url: url::Url, mut labels: HashMap<String, String>) -> (tracing_loki::Layer, LokiTask) {
    labels.extend(
        GLOBAL_LABELS
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
    );

    let (layer, controller, task) = labels
        .into_iter()
        .try_fold(tracing_loki::builder(), |builder, (key, value)| {
            builder.label(key, value)
        })
        .and_then(|builder| builder.build_controller_url(url))
        .unwrap_or_else(|err| panic!("BUG: invalid Loki logging config: {err}"));

    let task = tokio::spawn(task);

    (layer, LokiTask { task, controller })
}

fn init_panic_hook() {
    let current_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        // The default hook must run first, otherwise the panic may not be
        // visible at all if it happens inside of the `tracing` machinery itself.
        current_hook(panic_info);

        let backtrace = std::backtrace::Backtrace::capture();
        let location = panic_info.location().map(|location| {
            format!(
                "{}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            )
        });

        // If the panic message was formatted using interpolated values,
        // it will be a `String`. Otherwise, it will be a `&str`.
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<String>()
            .map(<_>::deref)
            .or_else(|| payload.downcast_ref::<&str>().map(<_>::deref))
            .unwrap_or("<unknown>");

        let span_trace = tracing_error::SpanTrace::capture();

        error!(
            target: "panic",
            thread = std::thread::current().name(),
            location,
            span_trace = %span_trace,
            backtrace = format_args!("\n{backtrace}"),
            "{message}"
        );
    }));
}
