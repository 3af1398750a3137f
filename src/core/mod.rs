//! Core churn engine: policy parsing and compilation, tasks and the scheduler.

pub mod collaborator;
pub mod compiler;
pub mod delete;
pub mod error;
pub mod policy;
pub mod resource;
pub mod scheduler;
pub mod task;

pub use collaborator::{Connector, Discovery, RemoteStore, ResourceCache};
pub use compiler::{PolicyCompiler, DELETE_OPERATION};
pub use delete::DeleteTask;
pub use error::{AppResult, ChurnError, ChurnResult};
pub use policy::{Policy, PolicySpec};
pub use resource::{Candidate, LabelSelector, ObjectRef, ResourceTypeId};
pub use scheduler::{run, RunReport, TaskExit, TaskOutcome};
pub use task::{Task, TaskState, TickSummary};
