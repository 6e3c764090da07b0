use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GR_LOG";

/// Directive used when `GR_LOG` is unset.
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,gr=debug",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the stderr subscriber. `-v` flags win over `GR_LOG`.
pub fn init(verbosity: u8) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) if verbosity == 0 => EnvFilter::new(directive),
        _ => EnvFilter::new(default_directive(verbosity)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }
}
