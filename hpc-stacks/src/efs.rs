// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The EFS stack: an NFS file system reachable from every private subnet

use crate::ports;
use cfn_types::ec2::PortRange;
use cfn_types::ec2::Protocol;
use cfn_types::ec2::SecurityGroupIngressProperties;
use cfn_types::ec2::SecurityGroupProperties;
use cfn_types::efs::FileSystemProperties;
use cfn_types::efs::MountTargetProperties;
use cfn_types::ssm::ParameterProperties;
use cfn_types::Output;
use cfn_types::Resource;
use cfn_types::Stack;
use cfn_types::Value;
use hpc_config::DeployConfig;

use crate::network::NetworkFacts;

pub const STACK_NAME: &str = "HpcEfsStack";

#[derive(Clone, Debug)]
pub struct EfsFacts {
    pub file_system_id: Value,
    pub security_group_id: Value,
}

pub fn build(
    config: &DeployConfig,
    network: &NetworkFacts,
) -> anyhow::Result<(Stack, EfsFacts)> {
    let mut stack = Stack::new(STACK_NAME, "EFS shared storage")?;

    let security_group = stack.template_mut().resource(
        "SecurityGroup",
        Resource::new(&SecurityGroupProperties::allowing_all_outbound(
            "EFS file system access",
            network.vpc_id.clone(),
        ))?,
    )?;
    stack.template_mut().resource(
        "SecurityGroupNfsIngress",
        Resource::new(&SecurityGroupIngressProperties::self_referencing(
            &security_group,
            Protocol::Tcp,
            PortRange::single(ports::NFS_PORT),
            "Allow NFS connection to EFS",
        ))?,
    )?;

    let file_system = stack.template_mut().resource(
        "FileSystem",
        Resource::new(&FileSystemProperties::general_purpose())?
            .deleted_with_stack(),
    )?;

    // The file system is mounted from compute nodes in every private
    // subnet, so it needs a mount target in each.
    for (index, subnet_id) in network.private_subnet_ids.iter().enumerate() {
        stack.template_mut().resource(
            &format!("MountTarget{}", index),
            Resource::new(&MountTargetProperties {
                file_system_id: Value::reference(&file_system),
                security_groups: vec![Value::get_att(
                    &security_group,
                    "GroupId",
                )],
                subnet_id: subnet_id.clone(),
            })?,
        )?;
    }

    stack.template_mut().resource(
        "DnsNameParameter",
        Resource::new(&ParameterProperties::string(
            &format!("{}/efs_dns_name", config.parameter_root),
            Value::sub("${FileSystem}.efs.${AWS::Region}.amazonaws.com"),
        ))?,
    )?;

    let file_system_id = stack.export(
        "FileSystemId",
        Output::new(Value::reference(&file_system))
            .description("EFS file system id"),
    )?;
    let security_group_id = stack.export(
        "SecurityGroupId",
        Output::new(Value::get_att(&security_group, "GroupId")),
    )?;

    Ok((stack, EfsFacts { file_system_id, security_group_id }))
}
