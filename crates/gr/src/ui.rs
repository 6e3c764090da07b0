//! User-facing status lines on stderr.

use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;

pub fn error(message: impl Display) {
    eprintln!(
        "{} {message}",
        "error:".if_supports_color(Stream::Stderr, |t| t.red().bold().to_string())
    );
}

pub fn warning(message: impl Display) {
    eprintln!(
        "{} {message}",
        "warning:".if_supports_color(Stream::Stderr, |t| t.yellow().bold().to_string())
    );
}

pub fn note(message: impl Display) {
    eprintln!(
        "{} {message}",
        "note:".if_supports_color(Stream::Stderr, |t| t.cyan().to_string())
    );
}

pub fn success(message: impl Display) {
    eprintln!(
        "{}",
        message
            .to_string()
            .if_supports_color(Stream::Stderr, |t| t.green().to_string())
    );
}
