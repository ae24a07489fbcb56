// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The individual checks run against an assembly.

use crate::checker::Checker;
use crate::checker::Kind;
use crate::checker::Severity;
use cfn_types::LogicalId;
use cfn_types::Resource;
use std::collections::BTreeSet;

pub(crate) fn perform_all_checks(checker: &mut Checker<'_>) {
    check_imports_resolve(checker);
    check_open_ingress(checker);
    check_vpc_flow_logs(checker);
    check_bucket_access_logging(checker);
    check_bucket_public_access(checker);
    check_bucket_ssl_policies(checker);
    check_file_system_encryption(checker);
}

/// Every `Fn::ImportValue` must name an export declared by an earlier stack,
/// or CloudFormation will refuse to create the importing stack.
fn check_imports_resolve(checker: &mut Checker<'_>) {
    let mut exported = BTreeSet::new();
    for stack in checker.assembly().stacks() {
        let mut imports = BTreeSet::new();
        for (_, resource) in stack.template().resources() {
            if let Some(properties) = resource.properties() {
                collect_imports(properties, &mut imports);
            }
        }
        for export_name in imports {
            if !exported.contains(&export_name) {
                checker.note(
                    stack.name(),
                    Severity::Fatal,
                    Kind::DanglingImport { export_name },
                );
            }
        }
        for (_, output) in stack.template().outputs() {
            if let Some(name) = output.export_name() {
                exported.insert(name.to_string());
            }
        }
    }
}

fn collect_imports(value: &serde_json::Value, imports: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(name)) =
                map.get("Fn::ImportValue")
            {
                imports.insert(name.clone());
            }
            for value in map.values() {
                collect_imports(value, imports);
            }
        }
        serde_json::Value::Array(values) => {
            for value in values {
                collect_imports(value, imports);
            }
        }
        _ => (),
    }
}

/// Flags ingress rules that admit traffic from the whole internet, whether
/// declared standalone or inline on a security group.
fn check_open_ingress(checker: &mut Checker<'_>) {
    for stack in checker.assembly().stacks() {
        for (id, resource) in stack.template().resources() {
            let open = match resource.resource_type() {
                "AWS::EC2::SecurityGroupIngress" => {
                    rule_admits_everyone(resource.properties())
                }
                "AWS::EC2::SecurityGroup" => resource
                    .property("SecurityGroupIngress")
                    .and_then(|rules| rules.as_array())
                    .map(|rules| {
                        rules.iter().any(|r| rule_admits_everyone(Some(r)))
                    })
                    .unwrap_or(false),
                _ => false,
            };
            if open {
                checker.note(
                    stack.name(),
                    Severity::Fatal,
                    Kind::OpenIngress { resource: id.to_string() },
                );
            }
        }
    }
}

fn rule_admits_everyone(rule: Option<&serde_json::Value>) -> bool {
    rule.and_then(|rule| rule.get("CidrIp"))
        .and_then(|cidr| cidr.as_str())
        .map(|cidr| cidr == "0.0.0.0/0")
        .unwrap_or(false)
}

/// A VPC without flow logs keeps no record of accepted or rejected traffic.
fn check_vpc_flow_logs(checker: &mut Checker<'_>) {
    for stack in checker.assembly().stacks() {
        let template = stack.template();
        let has_vpc =
            template.resources_of_type("AWS::EC2::VPC").next().is_some();
        let has_flow_log =
            template.resources_of_type("AWS::EC2::FlowLog").next().is_some();
        if has_vpc && !has_flow_log {
            checker.note(
                stack.name(),
                Severity::Warning,
                Kind::MissingFlowLogs,
            );
        }
    }
}

/// Buckets without server access logging keep no record of who read or
/// wrote objects.
fn check_bucket_access_logging(checker: &mut Checker<'_>) {
    for stack in checker.assembly().stacks() {
        for (id, resource) in
            stack.template().resources_of_type("AWS::S3::Bucket")
        {
            if resource.property("LoggingConfiguration").is_none() {
                checker.note(
                    stack.name(),
                    Severity::Warning,
                    Kind::MissingAccessLogging { bucket: id.to_string() },
                );
            }
        }
    }
}

/// Buckets must block all four public access paths.
fn check_bucket_public_access(checker: &mut Checker<'_>) {
    const PUBLIC_ACCESS_SETTINGS: [&str; 4] = [
        "BlockPublicAcls",
        "BlockPublicPolicy",
        "IgnorePublicAcls",
        "RestrictPublicBuckets",
    ];
    for stack in checker.assembly().stacks() {
        for (id, resource) in
            stack.template().resources_of_type("AWS::S3::Bucket")
        {
            let block = resource.property("PublicAccessBlockConfiguration");
            let all_blocked = PUBLIC_ACCESS_SETTINGS.iter().all(|setting| {
                block
                    .and_then(|b| b.get(setting))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            });
            if !all_blocked {
                checker.note(
                    stack.name(),
                    Severity::Fatal,
                    Kind::PublicAccessNotBlocked { bucket: id.to_string() },
                );
            }
        }
    }
}

/// Every bucket needs a companion policy denying plain-HTTP access.
fn check_bucket_ssl_policies(checker: &mut Checker<'_>) {
    for stack in checker.assembly().stacks() {
        let template = stack.template();
        for (id, _) in template.resources_of_type("AWS::S3::Bucket") {
            let enforced = template
                .resources_of_type("AWS::S3::BucketPolicy")
                .any(|(_, policy)| {
                    policy_covers_bucket(policy, id)
                        && policy_denies_insecure_transport(policy)
                });
            if !enforced {
                checker.note(
                    stack.name(),
                    Severity::Fatal,
                    Kind::SslNotEnforced { bucket: id.to_string() },
                );
            }
        }
    }
}

fn policy_covers_bucket(policy: &Resource, bucket: &LogicalId) -> bool {
    policy
        .property("Bucket")
        .and_then(|b| b.get("Ref"))
        .and_then(|r| r.as_str())
        == Some(bucket.as_str())
}

fn policy_denies_insecure_transport(policy: &Resource) -> bool {
    policy
        .property("PolicyDocument")
        .and_then(|document| document.get("Statement"))
        .and_then(|statements| statements.as_array())
        .map(|statements| {
            statements.iter().any(|statement| {
                statement.get("Effect").and_then(|e| e.as_str())
                    == Some("Deny")
                    && matches!(
                        statement
                            .get("Condition")
                            .and_then(|c| c.get("Bool"))
                            .and_then(|b| b.get("aws:SecureTransport")),
                        Some(serde_json::Value::String(s)) if s == "false"
                    )
            })
        })
        .unwrap_or(false)
}

/// EFS file systems must ask for encryption at rest explicitly.
fn check_file_system_encryption(checker: &mut Checker<'_>) {
    for stack in checker.assembly().stacks() {
        for (id, resource) in
            stack.template().resources_of_type("AWS::EFS::FileSystem")
        {
            let encrypted = resource
                .property("Encrypted")
                .and_then(|value| value.as_bool())
                .unwrap_or(false);
            if !encrypted {
                checker.note(
                    stack.name(),
                    Severity::Fatal,
                    Kind::UnencryptedFileSystem { file_system: id.to_string() },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::check_assembly;
    use crate::Kind;
    use crate::Severity;
    use cfn_types::s3::BucketPolicyProperties;
    use cfn_types::s3::BucketProperties;
    use cfn_types::s3::PolicyDocument;
    use cfn_types::Assembly;
    use cfn_types::Output;
    use cfn_types::Resource;
    use cfn_types::Stack;
    use cfn_types::Value;
    use serde_json::json;

    fn assembly_with(stacks: Vec<Stack>) -> Assembly {
        let mut assembly = Assembly::new();
        for stack in stacks {
            assembly.add_stack(stack).unwrap();
        }
        assembly
    }

    #[test]
    fn dangling_imports_are_fatal() -> anyhow::Result<()> {
        let mut consumer = Stack::new("Consumer", "imports a value")?;
        consumer.template_mut().resource(
            "Subnet",
            Resource::of_type(
                "AWS::EC2::Subnet",
                &json!({ "VpcId": { "Fn::ImportValue": "Network:VpcId" } }),
            )?,
        )?;
        let assembly = assembly_with(vec![consumer]);

        let report = check_assembly(&assembly, &[]);
        let note = report
            .notes()
            .iter()
            .find(|n| {
                n.kind
                    == Kind::DanglingImport {
                        export_name: "Network:VpcId".to_string(),
                    }
            })
            .expect("expected a dangling import note");
        assert_eq!(note.stack, "Consumer");
        assert_eq!(note.severity, Severity::Fatal);
        Ok(())
    }

    #[test]
    fn imports_resolve_against_earlier_stacks() -> anyhow::Result<()> {
        let mut producer = Stack::new("Producer", "exports a value")?;
        let vpc = producer.template_mut().resource(
            "Vpc",
            Resource::of_type(
                "AWS::EC2::VPC",
                &json!({ "CidrBlock": "10.0.0.0/16" }),
            )?,
        )?;
        let token =
            producer.export("VpcId", Output::new(Value::reference(&vpc)))?;

        let mut consumer = Stack::new("Consumer", "imports the value")?;
        consumer.template_mut().resource(
            "Subnet",
            Resource::of_type("AWS::EC2::Subnet", &json!({ "VpcId": token }))?,
        )?;

        let assembly = assembly_with(vec![producer, consumer]);
        let report = check_assembly(&assembly, &[]);
        assert!(
            !report
                .notes()
                .iter()
                .any(|n| matches!(n.kind, Kind::DanglingImport { .. })),
            "import of an earlier export should resolve: {:?}",
            report.notes()
        );
        Ok(())
    }

    #[test]
    fn world_open_ingress_is_fatal() -> anyhow::Result<()> {
        let mut stack = Stack::new("Edge", "security group rules")?;
        stack.template_mut().resource(
            "SshFromAnywhere",
            Resource::of_type(
                "AWS::EC2::SecurityGroupIngress",
                &json!({
                    "CidrIp": "0.0.0.0/0",
                    "FromPort": 22,
                    "IpProtocol": "tcp",
                    "ToPort": 22,
                }),
            )?,
        )?;
        stack.template_mut().resource(
            "SshFromCorp",
            Resource::of_type(
                "AWS::EC2::SecurityGroupIngress",
                &json!({
                    "CidrIp": "198.51.100.0/24",
                    "FromPort": 22,
                    "IpProtocol": "tcp",
                    "ToPort": 22,
                }),
            )?,
        )?;
        let assembly = assembly_with(vec![stack]);

        let report = check_assembly(&assembly, &[]);
        assert_eq!(report.notes().len(), 1);
        assert_eq!(
            report.notes()[0].kind,
            Kind::OpenIngress { resource: "SshFromAnywhere".to_string() }
        );
        assert!(report.has_fatal_notes());
        Ok(())
    }

    #[test]
    fn inline_ingress_rules_are_checked() -> anyhow::Result<()> {
        let mut stack = Stack::new("Edge", "security group rules")?;
        stack.template_mut().resource(
            "Wide",
            Resource::of_type(
                "AWS::EC2::SecurityGroup",
                &json!({
                    "GroupDescription": "wide open",
                    "SecurityGroupIngress": [{
                        "CidrIp": "0.0.0.0/0",
                        "FromPort": 443,
                        "IpProtocol": "tcp",
                        "ToPort": 443,
                    }],
                }),
            )?,
        )?;
        let assembly = assembly_with(vec![stack]);

        let report = check_assembly(&assembly, &[]);
        assert_eq!(
            report.notes(),
            &[crate::Note {
                stack: "Edge".to_string(),
                severity: Severity::Fatal,
                kind: Kind::OpenIngress { resource: "Wide".to_string() },
            }]
        );
        Ok(())
    }

    #[test]
    fn vpcs_without_flow_logs_warn() -> anyhow::Result<()> {
        let mut bare = Stack::new("Bare", "a VPC and nothing else")?;
        bare.template_mut().resource(
            "Vpc",
            Resource::of_type(
                "AWS::EC2::VPC",
                &json!({ "CidrBlock": "10.0.0.0/16" }),
            )?,
        )?;

        let mut logged = Stack::new("Logged", "a VPC with flow logs")?;
        let vpc = logged.template_mut().resource(
            "Vpc",
            Resource::of_type(
                "AWS::EC2::VPC",
                &json!({ "CidrBlock": "10.1.0.0/16" }),
            )?,
        )?;
        logged.template_mut().resource(
            "FlowLog",
            Resource::of_type(
                "AWS::EC2::FlowLog",
                &json!({
                    "ResourceId": Value::reference(&vpc),
                    "ResourceType": "VPC",
                    "TrafficType": "ALL",
                }),
            )?,
        )?;
        let assembly = assembly_with(vec![bare, logged]);

        let report = check_assembly(&assembly, &[]);
        let flow_log_notes: Vec<_> = report
            .notes()
            .iter()
            .filter(|n| n.kind == Kind::MissingFlowLogs)
            .collect();
        assert_eq!(flow_log_notes.len(), 1);
        assert_eq!(flow_log_notes[0].stack, "Bare");
        assert_eq!(flow_log_notes[0].severity, Severity::Warning);
        Ok(())
    }

    #[test]
    fn unlogged_buckets_warn() -> anyhow::Result<()> {
        let mut stack = Stack::new("Data", "two buckets")?;
        stack.template_mut().resource(
            "Scratch",
            Resource::of_type("AWS::S3::Bucket", &json!({}))?,
        )?;
        stack.template_mut().resource(
            "Audited",
            Resource::of_type(
                "AWS::S3::Bucket",
                &json!({
                    "LoggingConfiguration": {
                        "DestinationBucketName": "access-logs"
                    },
                }),
            )?,
        )?;
        let assembly = assembly_with(vec![stack]);

        let report = check_assembly(&assembly, &[]);
        let access_notes: Vec<_> = report
            .notes()
            .iter()
            .filter(|n| matches!(n.kind, Kind::MissingAccessLogging { .. }))
            .collect();
        assert_eq!(access_notes.len(), 1);
        assert_eq!(
            access_notes[0].kind,
            Kind::MissingAccessLogging { bucket: "Scratch".to_string() }
        );
        assert_eq!(access_notes[0].severity, Severity::Warning);
        Ok(())
    }

    #[test]
    fn buckets_must_block_public_access() -> anyhow::Result<()> {
        let mut stack = Stack::new("Data", "two buckets")?;
        stack.template_mut().resource(
            "Loose",
            Resource::of_type(
                "AWS::S3::Bucket",
                &json!({
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": false,
                    },
                }),
            )?,
        )?;
        stack.template_mut().resource(
            "Sealed",
            Resource::new(&BucketProperties::private_encrypted())?,
        )?;
        let assembly = assembly_with(vec![stack]);

        let report = check_assembly(&assembly, &[]);
        let public_notes: Vec<_> = report
            .notes()
            .iter()
            .filter(|n| matches!(n.kind, Kind::PublicAccessNotBlocked { .. }))
            .collect();
        assert_eq!(public_notes.len(), 1);
        assert_eq!(
            public_notes[0].kind,
            Kind::PublicAccessNotBlocked { bucket: "Loose".to_string() }
        );
        assert_eq!(public_notes[0].severity, Severity::Fatal);
        Ok(())
    }

    #[test]
    fn buckets_need_ssl_policies() -> anyhow::Result<()> {
        let mut stack = Stack::new("Data", "bucket with an SSL-only policy")?;
        let bucket = stack.template_mut().resource(
            "Bucket",
            Resource::new(&BucketProperties::private_encrypted())?,
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
        let report = check_assembly(&assembly_with(vec![stack]), &[]);
        assert!(
            !report
                .notes()
                .iter()
                .any(|n| matches!(n.kind, Kind::SslNotEnforced { .. })),
            "the deny-insecure policy should satisfy the check: {:?}",
            report.notes()
        );

        let mut bare = Stack::new("Data", "bucket without a policy")?;
        bare.template_mut().resource(
            "Bucket",
            Resource::new(&BucketProperties::private_encrypted())?,
        )?;
        let report = check_assembly(&assembly_with(vec![bare]), &[]);
        assert!(report.notes().iter().any(|n| n.kind
            == Kind::SslNotEnforced { bucket: "Bucket".to_string() }));
        Ok(())
    }

    #[test]
    fn unencrypted_file_systems_are_fatal() -> anyhow::Result<()> {
        let mut stack = Stack::new("Storage", "two file systems")?;
        stack.template_mut().resource(
            "Plain",
            Resource::of_type(
                "AWS::EFS::FileSystem",
                &json!({ "Encrypted": false }),
            )?,
        )?;
        stack.template_mut().resource(
            "Sealed",
            Resource::of_type(
                "AWS::EFS::FileSystem",
                &json!({ "Encrypted": true }),
            )?,
        )?;
        let assembly = assembly_with(vec![stack]);

        let report = check_assembly(&assembly, &[]);
        assert_eq!(
            report.notes(),
            &[crate::Note {
                stack: "Storage".to_string(),
                severity: Severity::Fatal,
                kind: Kind::UnencryptedFileSystem {
                    file_system: "Plain".to_string(),
                },
            }]
        );
        Ok(())
    }
}
