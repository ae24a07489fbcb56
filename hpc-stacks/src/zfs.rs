// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The OpenZFS stack: an FSx for OpenZFS file system exported over NFS
//!
//! The root volume is exported read-write to the whole VPC CIDR; access
//! control is the security group's job, which admits only NFS and its
//! companion ports between members.

use crate::ports;
use cfn_types::ec2::PortRange;
use cfn_types::ec2::Protocol;
use cfn_types::ec2::SecurityGroupIngressProperties;
use cfn_types::ec2::SecurityGroupProperties;
use cfn_types::fsx::ClientConfiguration;
use cfn_types::fsx::DiskIopsConfiguration;
use cfn_types::fsx::FileSystemProperties;
use cfn_types::fsx::NfsExport;
use cfn_types::fsx::OpenZfsConfiguration;
use cfn_types::fsx::RootVolumeConfiguration;
use cfn_types::ssm::ParameterProperties;
use cfn_types::Output;
use cfn_types::Resource;
use cfn_types::Stack;
use cfn_types::Value;
use hpc_config::DeployConfig;

use crate::network::NetworkFacts;

pub const STACK_NAME: &str = "HpcZfsStack";

const BACKUP_RETENTION_DAYS: u64 = 7;
const DAILY_BACKUP_START_TIME: &str = "03:00";
const WEEKLY_MAINTENANCE_START_TIME: &str = "7:06:00";
const NFS_EXPORT_OPTIONS: [&str; 4] =
    ["rw", "crossmnt", "async", "no_root_squash"];

const INGRESS_DESCRIPTION: &str = "Allow NFS connection to FSxZ";

#[derive(Clone, Debug)]
pub struct ZfsFacts {
    pub root_volume_id: Value,
    pub security_group_id: Value,
}

pub fn build(
    config: &DeployConfig,
    network: &NetworkFacts,
) -> anyhow::Result<(Stack, ZfsFacts)> {
    let mut stack = Stack::new(STACK_NAME, "FSx for OpenZFS shared storage")?;

    let security_group = stack.template_mut().resource(
        "SecurityGroup",
        Resource::new(&SecurityGroupProperties::allowing_all_outbound(
            "FSx for OpenZFS file system access",
            network.vpc_id.clone(),
        ))?,
    )?;

    // NFS over both transports: portmapper, NFS proper, and the mount,
    // status, and lock daemons.
    let port_sets = [
        ("Portmapper", PortRange::single(ports::PORTMAPPER_PORT)),
        ("Nfs", PortRange::single(ports::NFS_PORT)),
        ("Daemon", ports::OPENZFS_DAEMON_PORTS),
    ];
    for (label, range) in port_sets {
        for protocol in [Protocol::Tcp, Protocol::Udp] {
            stack.template_mut().resource(
                &format!(
                    "SecurityGroup{}{}Ingress",
                    label,
                    match protocol {
                        Protocol::Tcp => "Tcp",
                        Protocol::Udp => "Udp",
                    }
                ),
                Resource::new(
                    &SecurityGroupIngressProperties::self_referencing(
                        &security_group,
                        protocol,
                        range,
                        INGRESS_DESCRIPTION,
                    ),
                )?,
            )?;
        }
    }

    let file_system = stack.template_mut().resource(
        "FileSystem",
        Resource::new(&FileSystemProperties::open_zfs(
            OpenZfsConfiguration {
                automatic_backup_retention_days: BACKUP_RETENTION_DAYS,
                copy_tags_to_backups: true,
                copy_tags_to_volumes: true,
                daily_automatic_backup_start_time: DAILY_BACKUP_START_TIME
                    .to_string(),
                deployment_type: "SINGLE_AZ_2".to_string(),
                disk_iops_configuration: DiskIopsConfiguration {
                    mode: "AUTOMATIC".to_string(),
                },
                options: vec![
                    "DELETE_CHILD_VOLUMES_AND_SNAPSHOTS".to_string()
                ],
                root_volume_configuration: RootVolumeConfiguration {
                    copy_tags_to_snapshots: true,
                    data_compression_type: "ZSTD".to_string(),
                    nfs_exports: vec![NfsExport {
                        client_configurations: vec![ClientConfiguration {
                            clients: network.vpc_cidr.to_string(),
                            options: NFS_EXPORT_OPTIONS
                                .iter()
                                .map(|o| o.to_string())
                                .collect(),
                        }],
                    }],
                    read_only: false,
                },
                throughput_capacity: config.zfs.throughput,
                weekly_maintenance_start_time: WEEKLY_MAINTENANCE_START_TIME
                    .to_string(),
            },
            config.zfs.capacity,
            network.private_subnet_ids[0].clone(),
            Value::get_att(&security_group, "GroupId"),
        ))?,
    )?;

    stack.template_mut().resource(
        "DnsNameParameter",
        Resource::new(&ParameterProperties::string(
            &format!("{}/zfs_dns_name", config.parameter_root),
            Value::get_att(&file_system, "DNSName"),
        ))?,
    )?;

    let root_volume_id = stack.export(
        "RootVolumeId",
        Output::new(Value::get_att(&file_system, "RootVolumeId"))
            .description("OpenZFS root volume id"),
    )?;
    let security_group_id = stack.export(
        "SecurityGroupId",
        Output::new(Value::get_att(&security_group, "GroupId")),
    )?;

    Ok((stack, ZfsFacts { root_volume_id, security_group_id }))
}
