use color_eyre::Result;
use tracing::{error, Level, Subscriber};
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt::format, layer::SubscriberExt, EnvFilter, FmtSubscriber};

/// Crates whose events pass the configured level; everything else is filtered at `warn`.
const LOG_TARGETS: [&str; 2] = ["pvq_core", "pvq_client"];

fn env_filter(log_level: Level) -> EnvFilter {
	let directives = LOG_TARGETS
		.iter()
		.map(|target| format!("{target}={log_level}"))
		.collect::<Vec<_>>()
		.join(",");
	EnvFilter::new(format!("{directives},warn"))
}

pub fn install_panic_hooks() -> Result<()> {
	// initialize color-eyre hooks
	let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
		.display_location_section(true)
		.display_env_section(true)
		.into_hooks();

	// install hook as global handler
	eyre_hook.install()?;

	std::panic::set_hook(Box::new(move |panic_info| {
		let msg = format!("{}", panic_hook.panic_report(panic_info));
		error!("Error: {}", strip_ansi_escapes::strip_str(msg));

		#[cfg(debug_assertions)]
		{
			// better-panic stacktrace that is only enabled when debugging
			better_panic::Settings::auto()
				.most_recent_first(false)
				.lineno_suffix(true)
				.verbosity(better_panic::Verbosity::Medium)
				.create_panic_handler()(panic_info);
		}
	}));
	Ok(())
}

pub fn json_subscriber(log_level: Level) -> impl Subscriber + Send + Sync {
	FmtSubscriber::builder()
		.json()
		.with_env_filter(env_filter(log_level))
		.with_span_events(format::FmtSpan::CLOSE)
		.finish()
		.with(ErrorLayer::default())
}

pub fn default_subscriber(log_level: Level) -> impl Subscriber + Send + Sync {
	FmtSubscriber::builder()
		.with_env_filter(env_filter(log_level))
		.with_span_events(format::FmtSpan::CLOSE)
		.finish()
		.with(ErrorLayer::default())
}

/// Renders bytes as `0x`-prefixed hex.
pub fn to_hex(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

/// Parses hex text with or without `0x` prefix, ignoring surrounding whitespace.
pub fn from_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
	let text = text.trim();
	hex::decode(text.strip_prefix("0x").unwrap_or(text))
}
