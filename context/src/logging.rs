use tracing_subscriber::EnvFilter;

/// Level directive of a `verbosity` control value.
pub fn level_of_verbosity(verbosity: &str) -> &'static str {
    match verbosity.trim().to_lowercase().as_str() {
        "low" => "warn",
        "high" => "debug",
        _ => "info",
    }
}

/// Install the fmt subscriber once per process; `RUST_LOG` wins over `verbosity`.
///
/// A subscriber installed earlier (e.g. by a test harness) is kept.
pub fn init(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_of_verbosity(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_of_verbosity("low"), "warn");
        assert_eq!(level_of_verbosity("normal"), "info");
        assert_eq!(level_of_verbosity("HIGH"), "debug");
        assert_eq!(level_of_verbosity("anything"), "info");

        // second call must not panic
        init("low");
        init("high");
    }
}
