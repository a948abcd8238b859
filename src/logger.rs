use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const LOG_ENV: &str = "STRESS_RUNNER_LOG";

/// Runner events at info, dependencies only when they warn.
const DEFAULT_DIRECTIVES: &str = "warn,stress_runner=info";
const VERBOSE_DIRECTIVES: &str = "info,stress_runner=debug";

/// Filter directives: `STRESS_RUNNER_LOG` wins over `RUST_LOG`; without
/// either, `--verbose` picks the debug set.
fn directives(runner_env: Option<String>, rust_env: Option<String>, verbose: bool) -> String {
    let set = |value: &String| !value.trim().is_empty();
    runner_env
        .filter(set)
        .or_else(|| rust_env.filter(set))
        .unwrap_or_else(|| {
            if verbose {
                VERBOSE_DIRECTIVES.to_owned()
            } else {
                DEFAULT_DIRECTIVES.to_owned()
            }
        })
}

/// Logs go to stderr so stdout only carries the worker log view and reports.
/// A second call keeps the first subscriber.
pub fn init_logging(verbose: bool, no_color: bool) {
    let requested = directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        verbose,
    );
    let filter = EnvFilter::try_new(&requested).unwrap_or_else(|err| {
        eprintln!("Ignoring log filter '{}': {}", requested, err);
        EnvFilter::new(DEFAULT_DIRECTIVES)
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Logging already initialised");
    }
}
