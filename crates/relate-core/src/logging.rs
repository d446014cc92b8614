use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber for an embedding binary.
///
/// `verbose` follows a `-v` counter: 0 is info, 1 debug, more is trace.
/// `RUST_LOG` wins when set. Calling this twice is harmless.
pub fn init(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("relate_core={level},relate_domain={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Test-writer subscriber so log lines land in captured test output.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relate_core=debug")),
        )
        .with_test_writer()
        .try_init();
}
