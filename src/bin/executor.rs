//! CLI entry point matching the distilled original's `__main__.py`
//! contract: `hostname port [--logfile FILE] [--loglevel LEVEL]`.

use clap::Parser;
use tracing::{error, info};

use deepdump::config::{init_logging, Config};
use deepdump::net::subprocess::{ExecutionHarness, ExecutionRequest};
use deepdump::net::Listener;
use deepdump::value::PyValue;

/// Placeholder harness until a real user-code runner is wired in: returns
/// the watched root unchanged, so the listener is exercisable end to end
/// without a sandboxing story this crate doesn't own.
struct IdentityHarness;

impl ExecutionHarness for IdentityHarness {
    fn run(&mut self, _request: &ExecutionRequest) -> (PyValue, PyValue) {
        let root = PyValue::none();
        (root.clone(), root)
    }
}

fn main() {
    let config = Config::parse();
    init_logging(&config);

    info!(hostname = %config.hostname, port = config.port, "starting executor");

    let listener = match Listener::bind(&config.hostname, config.port) {
        Ok(l) => l,
        Err(err) => {
            error!(?err, "failed to bind listener");
            std::process::exit(1);
        }
    };

    let mut harness = IdentityHarness;
    if let Err(err) = listener.serve_forever(&mut harness) {
        error!(?err, "listener terminated");
        std::process::exit(1);
    }
}
