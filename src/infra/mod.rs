//! Cluster backends implementing the collaborator traits.

#[cfg(feature = "cluster")]
pub mod kube;
pub mod memory;

#[cfg(feature = "cluster")]
pub use self::kube::KubeCluster;
pub use memory::{DeleteRecord, InMemoryCluster};
