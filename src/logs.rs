use {
    super::*,
    tracing_appender::non_blocking::WorkerGuard,
    tracing_subscriber::Layer,
};

/// Filter used when `RUST_LOG` is unset.
fn default_filter(level: &str, enabled: bool) -> String {
    if enabled {
        format!("warn,solo={level}")
    } else {
        "off".into()
    }
}

pub(crate) fn init(level: &str, enabled: bool) -> WorkerGuard {
    let (writer, guard) = non_blocking(io::stderr());

    let filter = if enabled {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(level, enabled)))
    } else {
        EnvFilter::new(default_filter(level, enabled))
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .with_filter(filter),
        )
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters() {
        assert_eq!(default_filter("info", true), "warn,solo=info");
        assert_eq!(default_filter("debug", true), "warn,solo=debug");
        assert_eq!(default_filter("debug", false), "off");
    }
}
