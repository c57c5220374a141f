use colored::{Color, Colorize};
use env_logger::Builder;
use log::Level;
use std::io::Write;

use crate::ExtractionStatus;

/// Terminal colors for run summaries.
pub struct Colors;

impl Colors {
    pub const SUCCESS: Color = Color::Green;
    pub const SKIPPED: Color = Color::Cyan;
    pub const FAILURE: Color = Color::Red;
    pub const INTERRUPTED: Color = Color::Yellow;

    pub fn colorize(color: Color, text: &str) -> String {
        text.color(color).to_string()
    }

    pub fn for_status(status: ExtractionStatus) -> Color {
        match status {
            ExtractionStatus::Success => Self::SUCCESS,
            ExtractionStatus::FailureInterrupted => Self::INTERRUPTED,
            _ => Self::FAILURE,
        }
    }
}

pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // try_init: lib callers and tests may already have installed a logger
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
