//! Deletion task: random, bounded removal of managed objects.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::core::{
    Candidate, ChurnResult, Policy, RemoteStore, ResourceCache, ResourceTypeId, Task, TickSummary,
};

/// Deletes up to `limit` randomly chosen candidates every tick.
pub struct DeleteTask {
    name: String,
    policy: Policy,
    caches: Vec<(ResourceTypeId, Box<dyn ResourceCache>)>,
    store: Box<dyn RemoteStore>,
    rng: StdRng,
    finalized: bool,
}

impl DeleteTask {
    /// Build a task from a compiled policy and the handles it will own.
    ///
    /// `caches` holds one cache per policy resource, in policy order.
    pub fn new(
        name: impl Into<String>,
        policy: Policy,
        caches: Vec<(ResourceTypeId, Box<dyn ResourceCache>)>,
        store: Box<dyn RemoteStore>,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            caches,
            store,
            rng: StdRng::from_os_rng(),
            finalized: false,
        }
    }

    /// Replace the random source, e.g. with a seeded one.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// The compiled policy this task runs.
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Gather candidates from every synced cache.
    fn collect_candidates(&self) -> ChurnResult<Vec<Candidate>> {
        let mut candidates = Vec::with_capacity(100);
        for (resource, cache) in &self.caches {
            if !cache.has_synced() {
                debug!(task = %self.name, %resource, "skipping unsynced cache");
                continue;
            }
            candidates.extend(cache.list()?.into_iter().map(|object| Candidate {
                resource_type: resource.clone(),
                object,
            }));
        }
        Ok(candidates)
    }
}

#[async_trait]
impl Task for DeleteTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.policy.interval
    }

    async fn perform(&mut self) -> ChurnResult<TickSummary> {
        let mut candidates = self.collect_candidates()?;
        candidates.shuffle(&mut self.rng);

        let mut summary = TickSummary {
            candidates: candidates.len(),
            deleted: 0,
        };

        for candidate in candidates.iter().take(self.policy.limit) {
            info!(
                task = %self.name,
                resource = %candidate.resource_type,
                namespace = %candidate.object.namespace,
                name = %candidate.object.name,
                "deleting object"
            );
            self.store
                .delete(
                    &candidate.resource_type,
                    &candidate.object.namespace,
                    &candidate.object.name,
                )
                .await?;
            summary.deleted += 1;
        }

        Ok(summary)
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        for (_, cache) in &mut self.caches {
            cache.stop();
        }
        debug!(task = %self.name, "released resource caches");
    }
}
