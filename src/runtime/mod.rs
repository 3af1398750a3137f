//! Runtime adapters: stop-signal handling around the scheduler.

pub mod shutdown;

pub use shutdown::shutdown_token;
