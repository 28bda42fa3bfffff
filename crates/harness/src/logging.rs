use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter directives for a suite run.
///
/// The `wt.connection` target logs once-per-run lifecycle events; the
/// `wt.registry` target logs per-test session churn and is the noisy one.
fn filter_directives(verbosity: u8) -> &'static str {
	// 0 = silent (suppress harness lifecycle noise entirely)
	// 1 (-v) = run lifecycle at info, per-test churn only on warnings
	// 2+ (-vv) = debug/trace for everything
	match verbosity {
		0 => "error,wt.connection=off,wt.registry=off",
		1 => "info,wt.registry=warn",
		_ => "debug",
	}
}

/// Initializes stderr logging for a suite run. Call once per process.
///
/// `RUST_LOG` takes precedence over the `verbosity`-derived defaults.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
