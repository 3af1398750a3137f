//! Tests for utility functions

use std::io::IsTerminal;

use churn::util::{ansi_enabled, init_tracing, LogFormat};

#[test]
fn test_log_format_default() {
    assert_eq!(LogFormat::default(), LogFormat::Text);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing(LogFormat::Text);
    init_tracing(LogFormat::Json);
    tracing::info!("tracing initialized");
}

#[test]
fn test_ansi_follows_stderr_terminal() {
    assert_eq!(ansi_enabled(LogFormat::Text), std::io::stderr().is_terminal());
    assert!(!ansi_enabled(LogFormat::Json));
}
