//! # Churn
//!
//! A controlled-chaos workload generator that repeatedly deletes a bounded, randomized
//! subset of managed cluster objects on independent schedules.
//!
//! It is used to check that controllers and applications tolerate resource loss and
//! recreation: every object labelled `app.kubernetes.io/managed-by=churn` is a deletion
//! candidate, and each policy decides how many of them go, and how often.
//!
//! ## Policies
//!
//! A policy is written as a single token:
//!
//! ```text
//! OPERATION[:RESOURCE|PARAM=VALUE[,RESOURCE|PARAM=VALUE]...]
//! ```
//!
//! - `delete` is the only operation.
//! - `RESOURCE` is a short resource name (`pods`, `svc`, `ingresses.extensions`).
//! - `interval=<duration>` sets the time between ticks (default `60s`, minimum `1s`).
//! - `limit=<n>` caps deletions per tick (default `1`).
//!
//! When no resource is named, pods, services, ingresses and Contour `HTTPProxy`
//! objects are all candidates.
//!
//! ## Engine
//!
//! - [`core::PolicySpec`] parses a token.
//! - [`core::PolicyCompiler`] resolves names through a [`core::Discovery`], validates
//!   parameters and builds a [`core::Task`] whose cache and client handles come from a
//!   [`core::Connector`].
//! - [`core::run`] drives every task on its own timer until a stop token is cancelled,
//!   finalizes each task exactly once, and reports how each schedule ended.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use churn::config::ChurnConfig;
//! use churn::core::{run, PolicyCompiler};
//! use churn::infra::InMemoryCluster;
//! use tokio_util::sync::CancellationToken;
//!
//! let cluster = Arc::new(InMemoryCluster::with_default_types());
//! let compiler = PolicyCompiler::new(ChurnConfig::default(), cluster.clone(), cluster)?;
//! let tasks = compiler.compile_all(&["delete:pods,interval=5s,limit=2"])?;
//!
//! let stop = CancellationToken::new();
//! let report = run(stop.clone(), tasks).await;
//! report.into_result()?;
//! ```
//!
//! Backends live in [`infra`]: an in-memory cluster for tests and dry runs, and a
//! Kubernetes client behind the `cluster` feature.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Command-line surface.
pub mod cli;
/// Configuration models for policy defaults and candidate selection.
pub mod config;
/// Core churn engine: policies, tasks and the scheduler.
pub mod core;
/// Cluster backends implementing the collaborator traits.
pub mod infra;
/// Runtime adapters around the scheduler.
pub mod runtime;
/// Shared utilities.
pub mod util;
