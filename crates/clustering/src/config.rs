//! Strategy configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ClusteringError, Result},
    strategies::{
        depth_greedy::DepthGreedyClustering,
        horizontal::{ClusterLimit, HorizontalClustering},
        hybrid::HybridBalancing,
        resource_aware::{FactorMode, ResourceAwareBalancing},
        runtime::RuntimeBalancing,
    },
    strategy::ClusteringStrategy,
};

/// Strategy with its parameters, tagged by `method` in YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ClusteringConfig {
    DepthGreedy,
    Horizontal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cluster_num: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cluster_size: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    Hybrid {
        cluster_num: usize,
    },
    ResourceAware {
        cluster_num: usize,
        #[serde(default)]
        factor: FactorMode,
    },
    RuntimeBalancing {
        cluster_num: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

impl ClusteringConfig {
    /// Read [ClusteringConfig] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        let config: Self = serde_yaml::from_str(&std::fs::read_to_string(file)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that exactly one of `cluster_num` and `cluster_size` is given and that it is positive.
    pub fn validate(&self) -> Result<()> {
        self.limit().map(|_| ())
    }

    fn limit(&self) -> Result<Option<ClusterLimit>> {
        let limit = match *self {
            ClusteringConfig::DepthGreedy => return Ok(None),
            ClusteringConfig::Horizontal {
                cluster_num,
                cluster_size,
                ..
            } => match (cluster_num, cluster_size) {
                (Some(num), None) => ClusterLimit::Num(num),
                (None, Some(size)) => ClusterLimit::Size(size),
                _ => {
                    return Err(ClusteringError::InvalidConfig(
                        "exactly one of cluster_num and cluster_size must be set".to_string(),
                    ))
                }
            },
            ClusteringConfig::Hybrid { cluster_num }
            | ClusteringConfig::ResourceAware { cluster_num, .. }
            | ClusteringConfig::RuntimeBalancing { cluster_num, .. } => ClusterLimit::Num(cluster_num),
        };
        match limit {
            ClusterLimit::Num(0) => Err(ClusteringError::InvalidConfig("cluster_num must be positive".to_string())),
            ClusterLimit::Size(0) => Err(ClusteringError::InvalidConfig(
                "cluster_size must be positive".to_string(),
            )),
            limit => Ok(Some(limit)),
        }
    }

    /// Same config with the seed filled in for randomized strategies which have none.
    pub fn with_default_seed(mut self, default_seed: u64) -> Self {
        match &mut self {
            ClusteringConfig::Horizontal { seed, .. } | ClusteringConfig::RuntimeBalancing { seed, .. } => {
                seed.get_or_insert(default_seed);
            }
            _ => {}
        }
        self
    }

    /// Creates the configured strategy.
    pub fn build(&self) -> Result<Box<dyn ClusteringStrategy>> {
        let limit = self.limit()?;
        let strategy: Box<dyn ClusteringStrategy> = match *self {
            ClusteringConfig::DepthGreedy => Box::new(DepthGreedyClustering::new()),
            ClusteringConfig::Horizontal { seed, .. } => {
                let limit = limit.ok_or_else(|| ClusteringError::InvalidConfig("missing cluster limit".to_string()))?;
                Box::new(HorizontalClustering::with_seed(limit, seed))
            }
            ClusteringConfig::Hybrid { cluster_num } => Box::new(HybridBalancing::new(cluster_num)),
            ClusteringConfig::ResourceAware { cluster_num, factor } => {
                Box::new(ResourceAwareBalancing::new(cluster_num, factor))
            }
            ClusteringConfig::RuntimeBalancing { cluster_num, seed } => {
                Box::new(RuntimeBalancing::with_seed(cluster_num, seed))
            }
        };
        Ok(strategy)
    }
}
