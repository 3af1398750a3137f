//! Policy specification parsing and the compiled policy type.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::{ChurnError, ChurnResult, ResourceTypeId};

/// Unresolved policy as written on the command line.
///
/// The textual form is `OPERATION[:RESOURCE|PARAM=VALUE[,RESOURCE|PARAM=VALUE]...]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicySpec {
    /// Operation name, everything before the first `:`.
    pub operation: String,
    /// Bare resource names, in the order given.
    pub resource_names: Vec<String>,
    /// `key=value` parameters; the last occurrence of a key wins.
    pub parameters: BTreeMap<String, String>,
}

impl PolicySpec {
    /// Parse one policy specification token.
    pub fn parse(input: &str) -> ChurnResult<Self> {
        if input.is_empty() {
            return Err(ChurnError::Parse("empty policy specification".into()));
        }

        let (operation, args) = match input.split_once(':') {
            Some((operation, args)) => (operation, Some(args)),
            None => (input, None),
        };

        let mut spec = Self {
            operation: operation.to_string(),
            ..Self::default()
        };

        if let Some(args) = args {
            for token in args.split(',') {
                match token.split_once('=') {
                    Some((key, value)) => {
                        spec.parameters.insert(key.to_string(), value.to_string());
                    }
                    None => spec.resource_names.push(token.to_string()),
                }
            }
        }

        Ok(spec)
    }
}

impl FromStr for PolicySpec {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PolicySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.operation)?;
        let tokens: Vec<String> = self
            .resource_names
            .iter()
            .cloned()
            .chain(self.parameters.iter().map(|(k, v)| format!("{k}={v}")))
            .collect();
        if !tokens.is_empty() {
            write!(f, ":{}", tokens.join(","))?;
        }
        Ok(())
    }
}

/// Resolved, validated configuration for one recurring churn operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Resource types to operate on; never contains duplicates.
    pub resources: Vec<ResourceTypeId>,
    /// Time to wait between operations.
    pub interval: Duration,
    /// Maximum number of operations per interval.
    pub limit: usize,
}

impl Policy {
    /// Empty policy with the given defaults.
    pub const fn new(interval: Duration, limit: usize) -> Self {
        Self {
            resources: Vec::new(),
            interval,
            limit,
        }
    }

    /// Add a resource type, rejecting duplicates.
    pub fn add_resource(&mut self, resource: ResourceTypeId) -> ChurnResult<()> {
        if self.resources.contains(&resource) {
            return Err(ChurnError::Config(format!("duplicate resource: {resource}")));
        }
        self.resources.push(resource);
        Ok(())
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resources: Vec<String> = self.resources.iter().map(ToString::to_string).collect();
        write!(
            f,
            "resources=[{}] interval={} limit={}",
            resources.join(","),
            humantime::format_duration(self.interval),
            self.limit
        )
    }
}
