//! Simulator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default capacity of a simulated pool: 3.9 TiB, as the array reports it.
pub const DEFAULT_POOL_CAPACITY: u64 = 3_573_412_790_272;

/// A storage pool (`mdiskgrp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool name.
    pub name: String,
    /// Hyperswap site the pool belongs to, if any.
    #[serde(default)]
    pub site_id: Option<u32>,
    /// Total capacity in bytes.
    #[serde(default = "default_pool_capacity")]
    pub capacity_bytes: u64,
}

impl PoolConfig {
    /// A pool with the default capacity and no site.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site_id: None,
            capacity_bytes: DEFAULT_POOL_CAPACITY,
        }
    }

    /// Assign the pool to a site.
    #[must_use]
    pub const fn with_site(mut self, site_id: u32) -> Self {
        self.site_id = Some(site_id);
        self
    }
}

const fn default_pool_capacity() -> u64 {
    DEFAULT_POOL_CAPACITY
}

/// Identity of a simulated cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemIdentity {
    /// Cluster name, e.g. `storwize-svc-sim`.
    pub name: String,
    /// 16 hex digit cluster id.
    pub id: String,
}

impl SystemIdentity {
    /// Create an identity.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Configuration for a [`crate::Simulator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Pools available to `mkvdisk` and friends, in listing order.
    pub pools: Vec<PoolConfig>,
    /// The cluster the simulator answers as.
    pub local_system: SystemIdentity,
    /// The remote-copy partner cluster.
    pub aux_system: SystemIdentity,
    /// Firmware level reported by `lssystem`.
    pub code_level: String,
    /// `standard` or `hyperswap`.
    pub topology: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            pools: vec![
                PoolConfig::new("openstack").with_site(1),
                PoolConfig::new("openstack1").with_site(2),
                PoolConfig::new("openstack2"),
                PoolConfig::new("openstack3"),
            ],
            local_system: SystemIdentity::new("storwize-svc-sim", "0123456789ABCDEF"),
            aux_system: SystemIdentity::new("aux-svc-sim", "ABCDEF0123456789"),
            code_level: "7.4.0.0 (build 87.0.1311291000)".to_string(),
            topology: "standard".to_string(),
        }
    }
}

impl SimulatorConfig {
    /// Replace the pool list with plain pools of the given names.
    #[must_use]
    pub fn with_pools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pools = names.into_iter().map(PoolConfig::new).collect();
        self
    }

    /// Set the reported topology.
    #[must_use]
    pub fn with_topology(mut self, topology: impl Into<String>) -> Self {
        self.topology = topology.into();
        self
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if there are no pools, pool names repeat or
    /// are empty, or both systems share a name.
    pub fn validate(&self) -> Result<()> {
        if self.pools.is_empty() {
            return Err(Error::Config {
                reason: "at least one pool is required".to_string(),
            });
        }
        for (i, pool) in self.pools.iter().enumerate() {
            if pool.name.is_empty() {
                return Err(Error::Config {
                    reason: format!("pool {i} has an empty name"),
                });
            }
            if self.pools[..i].iter().any(|p| p.name == pool.name) {
                return Err(Error::Config {
                    reason: format!("duplicate pool name {}", pool.name),
                });
            }
        }
        if self.local_system.name == self.aux_system.name {
            return Err(Error::Config {
                reason: "local and auxiliary systems must differ".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_has_four_pools_and_two_sites() {
        let config = SimulatorConfig::default();
        let names: Vec<_> = config.pools.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["openstack", "openstack1", "openstack2", "openstack3"]);
        assert_eq!(config.pools[0].site_id, Some(1));
        assert_eq!(config.pools[1].site_id, Some(2));
        assert_eq!(config.aux_system.name, "aux-svc-sim");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            SimulatorConfig::from_json_str(r#"{"pools":[{"name":"gold"}]}"#).expect("parse");
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.pools[0].capacity_bytes, DEFAULT_POOL_CAPACITY);
        assert_eq!(config.local_system.name, "storwize-svc-sim");
    }

    #[test]
    fn empty_pool_list_is_rejected() {
        let err = SimulatorConfig::from_json_str(r#"{"pools":[]}"#).expect_err("no pools");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn duplicate_pool_is_rejected() {
        let config = SimulatorConfig::default().with_pools(["a", "a"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_json_error() {
        let err = SimulatorConfig::from_json_str("{").expect_err("bad json");
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn from_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"topology":"hyperswap"}}"#).expect("write");
        let config = SimulatorConfig::from_file(file.path()).expect("load");
        assert_eq!(config.topology, "hyperswap");
        assert_eq!(config.pools.len(), 4);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulatorConfig::from_file("/nonexistent/svcsim.json").expect_err("missing");
        assert!(matches!(err, Error::Io(_)));
    }
}
