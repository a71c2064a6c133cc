use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` overrides the verbosity default.
pub fn init_logging(verbosity: u8) {
	// The scenario report goes to stdout; stderr only carries operator logs.
	let filter = match verbosity {
		0 => "warn,specdrive.report=off,fantoccini=off,hyper=off",
		1 => "info,specdrive.report=off,fantoccini=warn,hyper=warn",
		_ => "debug,hyper=info",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
