//! Shared test setup: logging plus small chart fixtures

use std::env;
use std::sync::{Arc, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::services::ChartSession;
use crate::domain::{LayoutEngine, TemplateCatalog, ZoomLimits};
use crate::infrastructure::traits::AutoConfirmer;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // pdf and glyph internals drown out the chart logs
    let noisy_modules = ["printpdf", "lopdf", "fontdue"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Session on the built-in "General" chart whose confirmations all answer `answer`.
pub fn session_answering(answer: bool) -> ChartSession {
    ChartSession::new(
        LayoutEngine::default(),
        ZoomLimits::default(),
        TemplateCatalog::builtin(),
        Arc::new(AutoConfirmer { answer }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_calls_when_initializing_then_setup_runs_once() {
        init_test_setup();
        init_test_setup();
    }

    #[test]
    fn given_fixture_session_when_created_then_general_chart_loaded() {
        let session = session_answering(true);
        assert!(session.repository().contains("ops"));
    }
}
