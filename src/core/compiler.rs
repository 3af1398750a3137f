//! Compiles parsed policy specs into runnable tasks.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::ChurnConfig;
use crate::core::{
    ChurnError, ChurnResult, Connector, DeleteTask, Discovery, LabelSelector, Policy, PolicySpec,
    ResourceCache, ResourceTypeId, Task,
};

/// Operation name of the deletion policy.
pub const DELETE_OPERATION: &str = "delete";

/// Resolves, validates and instantiates policies against a cluster backend.
pub struct PolicyCompiler {
    config: ChurnConfig,
    selector: LabelSelector,
    discovery: Arc<dyn Discovery>,
    connector: Arc<dyn Connector>,
}

impl PolicyCompiler {
    /// Create a compiler. Fails if the configured label selector is malformed.
    pub fn new(
        config: ChurnConfig,
        discovery: Arc<dyn Discovery>,
        connector: Arc<dyn Connector>,
    ) -> ChurnResult<Self> {
        let selector = config.label_selector.parse()?;
        Ok(Self {
            config,
            selector,
            discovery,
            connector,
        })
    }

    /// Configuration the compiler applies.
    pub const fn config(&self) -> &ChurnConfig {
        &self.config
    }

    /// Resolve and validate a spec into a policy, without opening any handles.
    pub fn compile_policy(&self, spec: &PolicySpec) -> ChurnResult<Policy> {
        let mut policy = Policy::new(self.config.default_interval(), self.config.default_limit);

        let resolved = spec
            .resource_names
            .iter()
            .map(|name| self.discovery.resolve(name))
            .collect::<ChurnResult<Vec<_>>>()?;
        for resource in resolved {
            policy.add_resource(resource)?;
        }

        for (key, value) in &spec.parameters {
            match key.as_str() {
                "interval" => match humantime::parse_duration(value) {
                    Ok(interval) => policy.interval = interval,
                    Err(err) => warn!(%value, %err, "ignoring malformed interval"),
                },
                "limit" => match value.parse::<usize>() {
                    Ok(limit) => policy.limit = limit,
                    Err(err) => warn!(%value, %err, "ignoring malformed limit"),
                },
                _ => {
                    return Err(ChurnError::Config(format!("invalid parameter name: {key}")));
                }
            }
        }

        let min_interval = self.config.min_interval();
        if policy.interval < min_interval {
            return Err(ChurnError::Config(format!(
                "interval {} is below the minimum of {}",
                humantime::format_duration(policy.interval),
                humantime::format_duration(min_interval)
            )));
        }

        if policy.resources.is_empty() {
            for resource in &self.config.default_resources {
                policy.add_resource(resource.clone())?;
            }
        }

        Ok(policy)
    }

    /// Compile a spec into a task. `index` distinguishes tasks when seeding.
    pub fn compile(&self, spec: &PolicySpec, index: usize) -> ChurnResult<Box<dyn Task>> {
        let policy = self.compile_policy(spec)?;

        match spec.operation.as_str() {
            DELETE_OPERATION => {
                let task = self.build_delete_task(spec.to_string(), policy, index)?;
                Ok(Box::new(task))
            }
            other => Err(ChurnError::Config(format!("invalid operation name: {other}"))),
        }
    }

    /// Parse and compile every argument. Any failure aborts the whole set and releases
    /// the handles of tasks already built.
    pub fn compile_all<S: AsRef<str>>(&self, args: &[S]) -> ChurnResult<Vec<Box<dyn Task>>> {
        let specs = args
            .iter()
            .map(|arg| PolicySpec::parse(arg.as_ref()))
            .collect::<ChurnResult<Vec<_>>>()?;

        let mut tasks: Vec<Box<dyn Task>> = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            match self.compile(spec, index) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    for task in &mut tasks {
                        task.finalize();
                    }
                    return Err(err);
                }
            }
        }
        Ok(tasks)
    }

    fn build_delete_task(
        &self,
        name: String,
        policy: Policy,
        index: usize,
    ) -> ChurnResult<DeleteTask> {
        let mut caches: Vec<(ResourceTypeId, Box<dyn ResourceCache>)> =
            Vec::with_capacity(policy.resources.len());
        for resource in &policy.resources {
            match self.connector.open_cache(resource, &self.selector) {
                Ok(cache) => caches.push((resource.clone(), cache)),
                Err(err) => {
                    for (_, cache) in &mut caches {
                        cache.stop();
                    }
                    return Err(err);
                }
            }
        }
        let store = match self.connector.open_store() {
            Ok(store) => store,
            Err(err) => {
                for (_, cache) in &mut caches {
                    cache.stop();
                }
                return Err(err);
            }
        };

        info!(task = %name, %policy, "compiled delete policy");
        let task = DeleteTask::new(name, policy, caches, store);
        Ok(match self.config.seed {
            Some(seed) => task.with_rng(StdRng::seed_from_u64(seed.wrapping_add(index as u64))),
            None => task,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infra::memory::InMemoryCluster;

    fn compiler() -> PolicyCompiler {
        let cluster = Arc::new(InMemoryCluster::with_default_types());
        PolicyCompiler::new(ChurnConfig::default(), cluster.clone(), cluster).unwrap()
    }

    fn policy(text: &str) -> ChurnResult<Policy> {
        compiler().compile_policy(&PolicySpec::parse(text).unwrap())
    }

    #[test]
    fn defaults_apply_when_nothing_is_named() {
        let policy = policy("delete").unwrap();
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert_eq!(policy.limit, 1);
        assert_eq!(policy.resources, ChurnConfig::default().default_resources);
    }

    #[test]
    fn parameters_override_defaults() {
        let policy = policy("delete:pods,interval=2m,limit=5").unwrap();
        assert_eq!(policy.resources, vec![ResourceTypeId::new("", "v1", "pods")]);
        assert_eq!(policy.interval, Duration::from_secs(120));
        assert_eq!(policy.limit, 5);
    }

    #[test]
    fn interval_below_minimum_fails() {
        assert!(matches!(policy("delete:interval=500ms"), Err(ChurnError::Config(_))));
        assert!(policy("delete:interval=1s").is_ok());
    }

    #[test]
    fn unknown_parameter_fails() {
        let err = policy("delete:foo=bar").unwrap_err();
        assert_eq!(err, ChurnError::Config("invalid parameter name: foo".into()));
    }

    #[test]
    fn duplicate_resource_fails() {
        assert!(matches!(policy("delete:pods,pods"), Err(ChurnError::Config(_))));
        // Different spellings of the same type are still duplicates.
        assert!(matches!(policy("delete:pods,pod"), Err(ChurnError::Config(_))));
    }

    #[test]
    fn resolution_error_comes_first() {
        assert!(matches!(
            policy("delete:nosuchthing,foo=bar"),
            Err(ChurnError::Resolution(_))
        ));
    }

    #[test]
    fn unknown_operation_is_checked_after_parameters() {
        let compiler = compiler();
        let err = compiler
            .compile(&PolicySpec::parse("scale:pods").unwrap(), 0)
            .err()
            .unwrap();
        assert_eq!(err, ChurnError::Config("invalid operation name: scale".into()));

        let err = compiler
            .compile(&PolicySpec::parse("scale:foo=1").unwrap(), 0)
            .err()
            .unwrap();
        assert_eq!(err, ChurnError::Config("invalid parameter name: foo".into()));
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let policy = policy("delete:interval=soon,limit=-3").unwrap();
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert_eq!(policy.limit, 1);
    }

    #[test]
    fn compile_all_is_all_or_nothing() {
        let compiler = compiler();
        assert!(compiler.compile_all(&["delete:pods", ""]).is_err());
        let tasks = compiler.compile_all(&["delete:pods", "delete:services,limit=3"]).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].name(), "delete:services,limit=3");
    }
}
