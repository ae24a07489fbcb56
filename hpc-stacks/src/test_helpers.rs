// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures for the unit tests

use hpc_config::DeployConfig;
use hpc_config::DeployEnv;
use hpc_config::LustreConfig;
use hpc_config::PclusterConfig;
use hpc_config::VpcConfig;
use hpc_config::ZfsConfig;
use slog::o;
use slog::Logger;

pub(crate) fn config() -> DeployConfig {
    DeployConfig {
        label: "hpc-test".to_string(),
        key_name: "cluster-admin".to_string(),
        key_material: "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITESTKEY"
            .to_string(),
        trusted_cidr: "198.51.100.0/24".to_string(),
        parameter_root: "/hpc/test".to_string(),
        vpc: VpcConfig {
            cidr: "10.80.0.0/16".parse().unwrap(),
            enabled_az_count: 3,
            nat_per_az: false,
        },
        lustre: LustreConfig { throughput: 250, capacity: 1200 },
        zfs: ZfsConfig { throughput: 160, capacity: 256 },
        pcluster: PclusterConfig {
            version: "3.8.0".to_string(),
            rollback_on_failure: None,
            post_install_script: None,
        },
    }
}

pub(crate) fn env() -> DeployEnv {
    DeployEnv {
        account: "111122223333".to_string(),
        region: "eu-west-1".to_string(),
    }
}

pub(crate) fn log() -> Logger {
    Logger::root(slog::Discard, o!())
}
