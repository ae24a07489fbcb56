// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One-shot synthesis of the full deployment

use anyhow::Context;
use cfn_types::Assembly;
use cfn_types::Stack;
use hpc_config::DeployConfig;
use hpc_config::DeployEnv;
use slog::info;
use slog::Logger;

use crate::cluster;
use crate::efs;
use crate::keypair;
use crate::lustre;
use crate::network;
use crate::provider;
use crate::zfs;

/// Synthesizes every stack of the deployment, in creation order: key
/// pairs, network, the three storage stacks, the cluster provider, and
/// finally the cluster itself.
pub fn synthesize(
    log: &Logger,
    config: &DeployConfig,
    env: &DeployEnv,
) -> anyhow::Result<Assembly> {
    let mut assembly = Assembly::new();
    assembly.record_environment(&env.account, &env.region);

    let keypairs = keypair::build(config)
        .context("synthesizing the key-pair stack")?;
    add(log, &mut assembly, keypairs)?;

    let (network_stack, network) =
        network::build(config).context("synthesizing the network stack")?;
    add(log, &mut assembly, network_stack)?;

    let (efs_stack, efs) = efs::build(config, &network)
        .context("synthesizing the EFS stack")?;
    add(log, &mut assembly, efs_stack)?;

    let (lustre_stack, lustre) = lustre::build(config, &network)
        .context("synthesizing the Lustre stack")?;
    add(log, &mut assembly, lustre_stack)?;

    let (zfs_stack, zfs) = zfs::build(config, &network)
        .context("synthesizing the OpenZFS stack")?;
    add(log, &mut assembly, zfs_stack)?;

    let (provider_stack, provider) = provider::build(config, env)
        .context("synthesizing the cluster-provider stack")?;
    add(log, &mut assembly, provider_stack)?;

    let cluster_stack =
        cluster::build(config, &network, &efs, &lustre, &zfs, &provider)
            .context("synthesizing the cluster stack")?;
    add(log, &mut assembly, cluster_stack)?;

    info!(
        log, "synthesized deployment";
        "cluster" => &config.label,
        "account" => &env.account,
        "region" => &env.region,
    );
    Ok(assembly)
}

fn add(
    log: &Logger,
    assembly: &mut Assembly,
    stack: Stack,
) -> anyhow::Result<()> {
    info!(
        log, "synthesized stack";
        "stack" => stack.name(),
        "resources" => stack.template().resource_count(),
    );
    assembly.add_stack(stack)
}
