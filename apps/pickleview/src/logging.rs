//! stderr log subscriber.

use pickleview_config::{LogFormat, LogLevel, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins, then the configured level, then `-v` count.
pub fn filter(config: &LoggingConfig, verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let base = config
            .level
            .unwrap_or_else(|| LogLevel::from_verbosity(verbose));
        EnvFilter::new(config.filter_directive(base))
    })
}

pub fn init(config: &LoggingConfig, verbose: u8) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config, verbose))
        .with_writer(std::io::stderr);
    match config.format {
        LogFormat::Plain => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
