// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Lustre stack: an FSx for Lustre file system backed by a bucket
//!
//! Besides the file system and its security group, this stack declares a
//! companion S3 bucket and a bidirectional data-repository association:
//! objects under `lustre/` in the bucket surface in the file system, and
//! file-system writes export back to the bucket.  The association is only
//! declared here; the sync itself is the managed service's business.

use crate::ports;
use cfn_types::ec2::PortRange;
use cfn_types::ec2::Protocol;
use cfn_types::ec2::SecurityGroupIngressProperties;
use cfn_types::ec2::SecurityGroupProperties;
use cfn_types::fsx::DataRepositoryAssociationProperties;
use cfn_types::fsx::FileSystemProperties;
use cfn_types::fsx::LustreConfiguration;
use cfn_types::fsx::S3AutoPolicies;
use cfn_types::s3::BucketPolicyProperties;
use cfn_types::s3::BucketProperties;
use cfn_types::s3::PolicyDocument;
use cfn_types::ssm::ParameterProperties;
use cfn_types::Output;
use cfn_types::Resource;
use cfn_types::Stack;
use cfn_types::Value;
use hpc_config::DeployConfig;

use crate::network::NetworkFacts;

pub const STACK_NAME: &str = "HpcLustreStack";

/// Object events mirrored in both directions of the data-repository
/// association.
const DATA_REPOSITORY_EVENTS: [&str; 3] = ["NEW", "CHANGED", "DELETED"];

/// Chunk size for files imported from the bucket, in MiB.
const IMPORTED_FILE_CHUNK_SIZE_MIB: u64 = 1024;

const INGRESS_DESCRIPTION: &str =
    "Allows Lustre traffic between FSx for Lustre file servers";

#[derive(Clone, Debug)]
pub struct LustreFacts {
    pub file_system_id: Value,
    pub security_group_id: Value,
}

pub fn build(
    config: &DeployConfig,
    network: &NetworkFacts,
) -> anyhow::Result<(Stack, LustreFacts)> {
    let mut stack = Stack::new(STACK_NAME, "FSx for Lustre shared storage")?;

    let security_group = stack.template_mut().resource(
        "SecurityGroup",
        Resource::new(&SecurityGroupProperties::allowing_all_outbound(
            "FSx for Lustre file system access",
            network.vpc_id.clone(),
        ))?,
    )?;
    stack.template_mut().resource(
        "SecurityGroupLnetIngress",
        Resource::new(&SecurityGroupIngressProperties::self_referencing(
            &security_group,
            Protocol::Tcp,
            PortRange::single(ports::LUSTRE_PORT),
            INGRESS_DESCRIPTION,
        ))?,
    )?;
    stack.template_mut().resource(
        "SecurityGroupPeerIngress",
        Resource::new(&SecurityGroupIngressProperties::self_referencing(
            &security_group,
            Protocol::Tcp,
            ports::LUSTRE_PEER_PORTS,
            INGRESS_DESCRIPTION,
        ))?,
    )?;

    let file_system = stack.template_mut().resource(
        "FileSystem",
        Resource::new(&FileSystemProperties::lustre(
            LustreConfiguration {
                data_compression_type: "LZ4".to_string(),
                deployment_type: "PERSISTENT_2".to_string(),
                per_unit_storage_throughput: config.lustre.throughput,
            },
            config.lustre.capacity,
            network.private_subnet_ids[0].clone(),
            Value::get_att(&security_group, "GroupId"),
        ))?
        .deleted_with_stack(),
    )?;

    let bucket = stack.template_mut().resource(
        "Bucket",
        Resource::new(&BucketProperties::private_encrypted())?
            .deleted_with_stack(),
    )?;
    stack.template_mut().resource(
        "BucketPolicy",
        Resource::new(&BucketPolicyProperties {
            bucket: Value::reference(&bucket),
            policy_document: PolicyDocument::requiring_secure_transport(
                &bucket,
            ),
        })?,
    )?;

    stack.template_mut().resource(
        "DataRepositoryAssociation",
        Resource::new(&DataRepositoryAssociationProperties {
            batch_import_meta_data_on_create: true,
            data_repository_path: Value::sub("s3://${Bucket}/lustre/"),
            file_system_id: Value::reference(&file_system),
            file_system_path: "/".to_string(),
            imported_file_chunk_size: IMPORTED_FILE_CHUNK_SIZE_MIB,
            s3: S3AutoPolicies::bidirectional(&DATA_REPOSITORY_EVENTS),
        })?,
    )?;

    stack.template_mut().resource(
        "MountNameParameter",
        Resource::new(&ParameterProperties::string(
            &format!("{}/lustre_mount_name", config.parameter_root),
            Value::get_att(&file_system, "LustreMountName"),
        ))?,
    )?;
    stack.template_mut().resource(
        "DnsNameParameter",
        Resource::new(&ParameterProperties::string(
            &format!("{}/lustre_dns_name", config.parameter_root),
            Value::sub("${FileSystem}.fsx.${AWS::Region}.amazonaws.com"),
        ))?,
    )?;

    let file_system_id = stack.export(
        "FileSystemId",
        Output::new(Value::reference(&file_system))
            .description("FSx for Lustre file system id"),
    )?;
    let security_group_id = stack.export(
        "SecurityGroupId",
        Output::new(Value::get_att(&security_group, "GroupId")),
    )?;

    Ok((stack, LustreFacts { file_system_id, security_group_id }))
}

#[cfg(test)]
mod test {
    use super::build;
    use crate::network;
    use crate::test_helpers;
    use serde_json::json;

    #[test]
    fn lustre_port_set() {
        let config = test_helpers::config();
        let (_, facts) = network::build(&config).unwrap();
        let (stack, _) = build(&config, &facts).unwrap();
        let mut ports: Vec<(u64, u64, String)> = stack
            .template()
            .resources_of_type("AWS::EC2::SecurityGroupIngress")
            .map(|(_, rule)| {
                (
                    rule.property("FromPort").unwrap().as_u64().unwrap(),
                    rule.property("ToPort").unwrap().as_u64().unwrap(),
                    rule.property("IpProtocol")
                        .unwrap()
                        .as_str()
                        .unwrap()
                        .to_string(),
                )
            })
            .collect();
        ports.sort();
        assert_eq!(
            ports,
            vec![(988, 988, "tcp".to_string()), (1018, 1023, "tcp".to_string())]
        );
    }

    #[test]
    fn persistent_compressed_file_system() {
        let config = test_helpers::config();
        let (_, facts) = network::build(&config).unwrap();
        let (stack, _) = build(&config, &facts).unwrap();
        let (_, file_system) = stack
            .template()
            .resources_of_type("AWS::FSx::FileSystem")
            .next()
            .unwrap();
        assert_eq!(
            file_system.property("LustreConfiguration").unwrap(),
            &json!({
                "DataCompressionType": "LZ4",
                "DeploymentType": "PERSISTENT_2",
                "PerUnitStorageThroughput": 250,
            })
        );
        assert_eq!(
            file_system.property("StorageCapacity").unwrap(),
            &json!(1200)
        );
        assert_eq!(
            file_system.property("SubnetIds").unwrap(),
            &json!([{ "Fn::ImportValue": "HpcNetwork:PrivateSubnet0Id" }])
        );
    }

    #[test]
    fn bidirectional_data_repository_association() {
        let config = test_helpers::config();
        let (_, facts) = network::build(&config).unwrap();
        let (stack, _) = build(&config, &facts).unwrap();
        let (_, association) = stack
            .template()
            .resources_of_type("AWS::FSx::DataRepositoryAssociation")
            .next()
            .unwrap();
        assert_eq!(
            association.property("DataRepositoryPath").unwrap(),
            &json!({ "Fn::Sub": "s3://${Bucket}/lustre/" })
        );
        assert_eq!(
            association.property("FileSystemPath").unwrap(),
            &json!("/")
        );
        assert_eq!(
            association.property("ImportedFileChunkSize").unwrap(),
            &json!(1024)
        );
        let events = json!({ "Events": ["NEW", "CHANGED", "DELETED"] });
        assert_eq!(
            association.property("S3").unwrap(),
            &json!({
                "AutoExportPolicy": events,
                "AutoImportPolicy": events,
            })
        );
    }

    #[test]
    fn bucket_denies_insecure_transport() {
        let config = test_helpers::config();
        let (_, facts) = network::build(&config).unwrap();
        let (stack, _) = build(&config, &facts).unwrap();
        let (_, policy) = stack
            .template()
            .resources_of_type("AWS::S3::BucketPolicy")
            .next()
            .unwrap();
        let document = policy.property("PolicyDocument").unwrap();
        assert_eq!(
            document["Statement"][0]["Condition"],
            json!({ "Bool": { "aws:SecureTransport": "false" } })
        );
        assert_eq!(document["Statement"][0]["Effect"], json!("Deny"));
    }

    #[test]
    fn identity_parameters_published() {
        let config = test_helpers::config();
        let (_, facts) = network::build(&config).unwrap();
        let (stack, _) = build(&config, &facts).unwrap();
        let names: Vec<&str> = stack
            .template()
            .resources_of_type("AWS::SSM::Parameter")
            .map(|(_, p)| p.property("Name").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["/hpc/test/lustre_dns_name", "/hpc/test/lustre_mount_name"]
        );
    }
}
