// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The cluster stack: one custom resource carrying the assembled
//! configuration document
//!
//! The cluster is created and managed by the provider stack's service, not
//! by the deployment engine itself, and it is retained on stack deletion:
//! tearing down the deployment leaves a running cluster in place, unlike
//! the storage stacks, which delete with their stacks.

use cfn_types::Resource;
use cfn_types::Stack;
use cfn_types::Value;
use hpc_config::DeployConfig;
use serde::Serialize;

use crate::cluster_config;
use crate::cluster_config::ClusterConfig;
use crate::efs::EfsFacts;
use crate::lustre::LustreFacts;
use crate::network::NetworkFacts;
use crate::provider::ProviderFacts;
use crate::zfs::ZfsFacts;

pub const STACK_NAME: &str = "HpcCluster";

pub const CLUSTER_RESOURCE_TYPE: &str = "Custom::PClusterCluster";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ClusterProperties {
    cluster_configuration: ClusterConfig,
    cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback_on_failure: Option<bool>,
    service_token: Value,
}

pub fn build(
    config: &DeployConfig,
    network: &NetworkFacts,
    efs: &EfsFacts,
    lustre: &LustreFacts,
    zfs: &ZfsFacts,
    provider: &ProviderFacts,
) -> anyhow::Result<Stack> {
    let cluster_configuration =
        cluster_config::assemble(config, network, efs, lustre, zfs)?;
    let mut stack = Stack::new(STACK_NAME, "ParallelCluster cluster")?;
    stack.template_mut().resource(
        "Cluster",
        Resource::of_type(
            CLUSTER_RESOURCE_TYPE,
            &ClusterProperties {
                cluster_configuration,
                cluster_name: config.label.clone(),
                rollback_on_failure: config.pcluster.rollback_on_failure,
                service_token: provider.service_token.clone(),
            },
        )?
        .retained(),
    )?;
    Ok(stack)
}
