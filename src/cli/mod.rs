pub mod app;
pub mod models;
pub mod scenarios;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise warnings only, plus the echo target
/// and debug output on request.
pub fn init_logging(verbose: bool, echo: bool) {
    let mut directives = vec![if verbose { "rustmemorm=debug" } else { "rustmemorm=warn" }];
    if echo {
        directives.push("rustmemorm::echo=info");
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives.join(",")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
