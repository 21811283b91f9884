//! Console logging setup.
//!
//! All diagnostics go to stdout through `env_logger`, one line per record:
//!
//! ```text
//! >>> Building Debug products
//! Warning: >>> ...
//! Error: >>> Build failed
//! ```
//!
//! The default level is `info` (`debug` with `--verbose`). `UNIBUILD_LOG` takes an
//! env_logger filter expression and is applied on top.

use env_logger::fmt::Formatter;
use log::{Level, LevelFilter, Record};
use std::io::{self, Write};

/// Environment variable holding extra log filters.
pub const LOG_ENV: &str = "UNIBUILD_LOG";

/// Installs the global logger. Calling it again is a no-op.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format(format_record);
    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

/// Line prefix for a level.
pub fn prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "Error: >>> ",
        Level::Warn => "Warning: >>> ",
        Level::Info => ">>> ",
        Level::Debug | Level::Trace => ">>> [debug] ",
    }
}

fn format_record(buf: &mut Formatter, record: &Record<'_>) -> io::Result<()> {
    writeln!(buf, "{}{}", prefix(record.level()), record.args())
}
