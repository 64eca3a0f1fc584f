// SPDX-License-Identifier: MIT

use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

impl LogLevel {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => LogLevel::Quiet,
            (false, true) => LogLevel::Verbose,
            _ => LogLevel::Normal,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Normal => "warn,mkimg=info",
            LogLevel::Verbose => "debug",
        }
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over the flags.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    if let Err(e) = tracing_subscriber::fmt()
        .with_target(level == LogLevel::Verbose)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
    {
        eprintln!("[mkimg] failed to initialize logging: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
        assert_eq!(LogLevel::from_flags(false, true), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
    }
}
