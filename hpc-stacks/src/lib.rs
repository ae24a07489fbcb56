// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stack definitions for an HPC cluster deployment
//!
//! The deployment is a fixed set of seven stacks: SSH key pairs, a VPC
//! with three subnet tiers, three shared-storage stacks (EFS, FSx for
//! Lustre, FSx for OpenZFS) with their security groups and published
//! endpoints, the ParallelCluster custom-resource provider, and the
//! cluster itself.  Each stack module exposes a `build` function producing
//! a [`cfn_types::Stack`] plus the facts (cross-stack import tokens)
//! downstream stacks consume; [`app::synthesize`] wires them together in
//! creation order.
//!
//! Everything here is declarative: synthesis is a pure pass from the
//! loaded configuration to an [`cfn_types::Assembly`], and the deployment
//! engine does the rest.

pub mod app;
pub mod cluster;
pub mod cluster_config;
pub mod efs;
pub mod keypair;
pub mod lustre;
pub mod network;
pub mod ports;
pub mod provider;
pub mod zfs;

#[cfg(test)]
mod test_helpers;
