//! Tracing subscriber setup for hosts embedding the engine.
//!
//! Priority: `RUST_LOG` env var, then explicit `debug`, then explicit
//! `verbose`, then the default `sai=info,warn,error` filter.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_tracing(verbose: bool, debug: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if debug {
            EnvFilter::new("debug")
        } else if verbose {
            EnvFilter::new("sai=debug,info")
        } else {
            EnvFilter::new("sai=info,warn,error")
        };

        tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
    });
}
