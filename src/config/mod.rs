//! Configuration models for policy defaults and candidate selection.

pub mod churn;

pub use churn::{default_delete_candidates, ChurnConfig, DEFAULT_LABEL_SELECTOR};
