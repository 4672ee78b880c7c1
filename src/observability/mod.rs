//! Observability module providing structured logging.
//!
//! Logging goes through `tracing` with a configurable `fmt` layer (pretty,
//! compact, JSON) and an `EnvFilter` that `RUST_LOG` overrides.

mod tracing_init;

pub use tracing_init::*;
