// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deployment configuration for the HPC stack set
//!
//! A deployment is described by one JSON document, loaded once before any
//! stack is synthesized and read-only afterwards.  Every key a stack
//! consumes is required here, so a missing key fails the load (with the
//! field named in the error) rather than surfacing as a half-synthesized
//! deployment.  The only optional keys are
//! [`PclusterConfig::rollback_on_failure`] and
//! [`PclusterConfig::post_install_script`], which drop out of the
//! synthesized output when unset.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use ipnetwork::Ipv4Network;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Environment variable naming the configuration file to load.
pub const CONFIG_ENV_VAR: &str = "HPC_DEPLOY_CONFIG";
/// Environment variable naming the account to deploy into.
pub const ACCOUNT_ENV_VAR: &str = "HPC_DEPLOY_ACCOUNT";
/// Environment variable naming the region to deploy into.
pub const REGION_ENV_VAR: &str = "HPC_DEPLOY_REGION";
/// Configuration file used when [`CONFIG_ENV_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading \"{path}\"")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("error parsing \"{path}\"")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: serde_json::Error,
    },
}

/// Configuration for one deployment
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    /// Cluster name, used for the cluster resource and its label.
    pub label: String,
    /// Name of the administrative key pair.
    pub key_name: String,
    /// Public key material for the administrative key pair.
    pub key_material: String,
    /// CIDR block allowed to reach the head node over SSH.
    pub trusted_cidr: String,
    /// Root of the parameter-store namespace storage endpoints are
    /// published under.
    pub parameter_root: String,
    pub vpc: VpcConfig,
    pub lustre: LustreConfig,
    pub zfs: ZfsConfig,
    pub pcluster: PclusterConfig,
}

impl DeployConfig {
    pub fn from_file(path: &Utf8Path) -> Result<DeployConfig, LoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config = serde_json::from_str(&contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VpcConfig {
    /// CIDR block for the VPC; subnet blocks are carved out of it.
    #[schemars(with = "String")]
    pub cidr: Ipv4Network,
    /// How many availability zones to spread each subnet tier across.
    pub enabled_az_count: usize,
    /// One NAT gateway per availability zone when true; a single shared
    /// gateway otherwise.
    pub nat_per_az: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LustreConfig {
    /// Per-unit storage throughput, in MB/s/TiB.
    pub throughput: u64,
    /// Storage capacity in GiB.
    pub capacity: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ZfsConfig {
    /// Throughput capacity in MB/s.
    pub throughput: u64,
    /// Storage capacity in GiB.
    pub capacity: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PclusterConfig {
    /// ParallelCluster release whose custom-resource provider to install.
    pub version: String,
    /// Whether a failed cluster create rolls back automatically.  Omitted
    /// from the cluster resource when unset, leaving the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_on_failure: Option<bool>,
    /// Script URL run on each compute node after configuration.  No
    /// post-install action is declared when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_install_script: Option<String>,
}

/// The deployment target, taken from the environment rather than the
/// configuration file so one configuration can deploy to several targets.
#[derive(Clone, Debug, PartialEq)]
pub struct DeployEnv {
    pub account: String,
    pub region: String,
}
