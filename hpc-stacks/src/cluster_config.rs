// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembly of the cluster configuration document
//!
//! [`assemble`] is a pure function from the deployment configuration and
//! the other stacks' facts to the nested document the ParallelCluster
//! provider expects, so the document's shape can be tested without
//! provisioning anything.  Fixed policy lives here as constants: Slurm
//! tuning, EBS defaults, the IAM policy attachment, and the two compute
//! instance families.
//!
//! The provider's schema spells several scalars as strings ("20", "true");
//! the field types here stay honest and the string spelling is applied at
//! serialization time.

use anyhow::ensure;
use cfn_types::Value;
use hpc_config::DeployConfig;
use serde::Serialize;
use serde::Serializer;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::efs::EfsFacts;
use crate::lustre::LustreFacts;
use crate::network::NetworkFacts;
use crate::zfs::ZfsFacts;

const IMAGE_OS: &str = "alinux2";
const HEAD_NODE_INSTANCE_TYPE: &str = "m7i-flex.large";
const HEAD_NODE_ROOT_VOLUME_GIB: u64 = 100;
const COMPUTE_ROOT_VOLUME_GIB: u64 = 200;
const ROOT_VOLUME_TYPE: &str = "gp3";
const QUEUE_MAX_COUNT: u64 = 20;
const SCALEDOWN_IDLETIME_MINUTES: u64 = 5;
const MANAGED_INSTANCE_CORE_POLICY: &str =
    "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore";

/// How many private subnets the compute queues spread across.
const COMPUTE_ZONE_COUNT: usize = 3;

/// The two compute instance families; each gets one queue per compute
/// zone, named `<queue_prefix><zone + 1>`.
pub const INSTANCE_FAMILIES: [InstanceFamily; 2] = [
    InstanceFamily {
        queue_prefix: "icl",
        resource_name: "c6i",
        instance_type: "c6i.32xlarge",
    },
    InstanceFamily {
        queue_prefix: "spr",
        resource_name: "c7i",
        instance_type: "c7i.48xlarge",
    },
];

#[derive(Clone, Copy, Debug)]
pub struct InstanceFamily {
    pub queue_prefix: &'static str,
    pub resource_name: &'static str,
    pub instance_type: &'static str,
}

/// Serializes a scalar as its string spelling, which is how the provider's
/// schema wants booleans and counts.
fn as_string<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterConfig {
    pub head_node: HeadNode,
    pub image: Image,
    pub scheduling: Scheduling,
    pub shared_storage: Vec<SharedStorageEntry>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    pub os: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeadNode {
    pub iam: IamSettings,
    pub instance_type: String,
    pub local_storage: LocalStorage,
    pub networking: HeadNodeNetworking,
    pub ssh: Ssh,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamSettings {
    pub additional_iam_policies: Vec<IamPolicy>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamPolicy {
    pub policy: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalStorage {
    pub root_volume: RootVolume,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RootVolume {
    #[serde(serialize_with = "as_string")]
    pub encrypted: bool,
    #[serde(serialize_with = "as_string")]
    pub size: u64,
    pub volume_type: String,
}

impl RootVolume {
    /// The EBS defaults every root volume shares, at the given size.
    fn encrypted_gp3(size: u64) -> RootVolume {
        RootVolume {
            encrypted: true,
            size,
            volume_type: ROOT_VOLUME_TYPE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeadNodeNetworking {
    pub additional_security_groups: Vec<Value>,
    pub subnet_id: Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ssh {
    pub allowed_ips: String,
    pub key_name: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Scheduling {
    pub scheduler: String,
    pub slurm_queues: Vec<SlurmQueue>,
    pub slurm_settings: SlurmSettings,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlurmSettings {
    pub custom_slurm_settings: Vec<BTreeMap<String, String>>,
    pub queue_update_strategy: String,
    #[serde(serialize_with = "as_string")]
    pub scaledown_idletime: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlurmQueue {
    pub capacity_type: String,
    pub compute_resources: Vec<ComputeResource>,
    pub compute_settings: ComputeSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_actions: Option<CustomActions>,
    #[serde(serialize_with = "as_string")]
    pub job_exclusive_allocation: bool,
    pub name: String,
    pub networking: QueueNetworking,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeSettings {
    pub local_storage: LocalStorage,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeResource {
    #[serde(serialize_with = "as_string")]
    pub disable_simultaneous_multithreading: bool,
    pub efa: Efa,
    pub instance_type: String,
    #[serde(serialize_with = "as_string")]
    pub max_count: u64,
    #[serde(serialize_with = "as_string")]
    pub min_count: u64,
    pub name: String,
    pub networking: ComputeResourceNetworking,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Efa {
    #[serde(serialize_with = "as_string")]
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeResourceNetworking {
    pub placement_group: PlacementGroup,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlacementGroup {
    #[serde(serialize_with = "as_string")]
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueNetworking {
    pub additional_security_groups: Vec<Value>,
    pub subnet_ids: Vec<Value>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomActions {
    pub on_node_configured: OnNodeConfigured,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OnNodeConfigured {
    pub script: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedStorageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efs_settings: Option<EfsSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsx_lustre_settings: Option<FsxLustreSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsx_open_zfs_settings: Option<FsxOpenZfsSettings>,
    pub mount_dir: String,
    pub name: String,
    pub storage_type: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EfsSettings {
    pub file_system_id: Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FsxLustreSettings {
    pub file_system_id: Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FsxOpenZfsSettings {
    pub volume_id: Value,
}

/// Merges the fixed policy fragments with the per-deployment facts into
/// the document the cluster resource carries.
pub fn assemble(
    config: &DeployConfig,
    network: &NetworkFacts,
    efs: &EfsFacts,
    lustre: &LustreFacts,
    zfs: &ZfsFacts,
) -> anyhow::Result<ClusterConfig> {
    ensure!(
        !network.public_subnet_ids.is_empty(),
        "the head node needs a public subnet"
    );
    ensure!(
        network.private_subnet_ids.len() >= COMPUTE_ZONE_COUNT,
        "the compute queues need {} private subnets, the network has {}",
        COMPUTE_ZONE_COUNT,
        network.private_subnet_ids.len()
    );

    // Every queue and the head node carry all three storage groups, so
    // any node can mount any of the file systems.
    let storage_security_groups = vec![
        efs.security_group_id.clone(),
        lustre.security_group_id.clone(),
        zfs.security_group_id.clone(),
    ];

    let custom_actions =
        config.pcluster.post_install_script.as_ref().map(|script| {
            CustomActions {
                on_node_configured: OnNodeConfigured {
                    script: script.clone(),
                },
            }
        });

    // Six queues: the Cartesian product of the two instance families and
    // the three compute zones, family-major.
    let mut slurm_queues = Vec::new();
    for family in INSTANCE_FAMILIES {
        for zone in 0..COMPUTE_ZONE_COUNT {
            slurm_queues.push(SlurmQueue {
                capacity_type: "ONDEMAND".to_string(),
                compute_resources: vec![ComputeResource {
                    disable_simultaneous_multithreading: true,
                    efa: Efa { enabled: true },
                    instance_type: family.instance_type.to_string(),
                    max_count: QUEUE_MAX_COUNT,
                    min_count: 0,
                    name: family.resource_name.to_string(),
                    networking: ComputeResourceNetworking {
                        placement_group: PlacementGroup { enabled: true },
                    },
                }],
                compute_settings: ComputeSettings {
                    local_storage: LocalStorage {
                        root_volume: RootVolume::encrypted_gp3(
                            COMPUTE_ROOT_VOLUME_GIB,
                        ),
                    },
                },
                custom_actions: custom_actions.clone(),
                job_exclusive_allocation: true,
                name: format!("{}{}", family.queue_prefix, zone + 1),
                networking: QueueNetworking {
                    additional_security_groups: storage_security_groups
                        .clone(),
                    subnet_ids: vec![network.private_subnet_ids[zone]
                        .clone()],
                },
            });
        }
    }

    Ok(ClusterConfig {
        head_node: HeadNode {
            iam: IamSettings {
                additional_iam_policies: vec![IamPolicy {
                    policy: MANAGED_INSTANCE_CORE_POLICY.to_string(),
                }],
            },
            instance_type: HEAD_NODE_INSTANCE_TYPE.to_string(),
            local_storage: LocalStorage {
                root_volume: RootVolume::encrypted_gp3(
                    HEAD_NODE_ROOT_VOLUME_GIB,
                ),
            },
            networking: HeadNodeNetworking {
                additional_security_groups: storage_security_groups.clone(),
                subnet_id: network.public_subnet_ids[0].clone(),
            },
            ssh: Ssh {
                allowed_ips: config.trusted_cidr.clone(),
                key_name: config.key_name.clone(),
            },
        },
        image: Image { os: IMAGE_OS.to_string() },
        scheduling: Scheduling {
            scheduler: "slurm".to_string(),
            slurm_queues,
            slurm_settings: SlurmSettings {
                custom_slurm_settings: vec![BTreeMap::from([(
                    "JobRequeue".to_string(),
                    "0".to_string(),
                )])],
                queue_update_strategy: "DRAIN".to_string(),
                scaledown_idletime: SCALEDOWN_IDLETIME_MINUTES,
            },
        },
        shared_storage: vec![
            SharedStorageEntry {
                efs_settings: Some(EfsSettings {
                    file_system_id: efs.file_system_id.clone(),
                }),
                fsx_lustre_settings: None,
                fsx_open_zfs_settings: None,
                mount_dir: "/efs".to_string(),
                name: "Efs".to_string(),
                storage_type: "Efs".to_string(),
            },
            SharedStorageEntry {
                efs_settings: None,
                fsx_lustre_settings: Some(FsxLustreSettings {
                    file_system_id: lustre.file_system_id.clone(),
                }),
                fsx_open_zfs_settings: None,
                mount_dir: "/lustre".to_string(),
                name: "Lustre".to_string(),
                storage_type: "FsxLustre".to_string(),
            },
            SharedStorageEntry {
                efs_settings: None,
                fsx_lustre_settings: None,
                fsx_open_zfs_settings: Some(FsxOpenZfsSettings {
                    volume_id: zfs.root_volume_id.clone(),
                }),
                mount_dir: "/zfs".to_string(),
                name: "Zfs".to_string(),
                storage_type: "FsxOpenZfs".to_string(),
            },
        ],
    })
}
