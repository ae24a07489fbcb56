// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! S3 resource properties

use crate::template::LogicalId;
use crate::template::ResourceProperties;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketProperties {
    pub bucket_encryption: BucketEncryption,
    pub public_access_block_configuration: PublicAccessBlockConfiguration,
}

impl BucketProperties {
    /// A bucket with all public access blocked and default server-side
    /// encryption.
    pub fn private_encrypted() -> BucketProperties {
        BucketProperties {
            bucket_encryption: BucketEncryption {
                server_side_encryption_configuration: vec![
                    ServerSideEncryptionRule {
                        server_side_encryption_by_default:
                            ServerSideEncryptionByDefault {
                                sse_algorithm: "AES256".to_string(),
                            },
                    },
                ],
            },
            public_access_block_configuration: PublicAccessBlockConfiguration {
                block_public_acls: true,
                block_public_policy: true,
                ignore_public_acls: true,
                restrict_public_buckets: true,
            },
        }
    }
}

impl ResourceProperties for BucketProperties {
    const TYPE: &'static str = "AWS::S3::Bucket";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketEncryption {
    pub server_side_encryption_configuration: Vec<ServerSideEncryptionRule>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionRule {
    pub server_side_encryption_by_default: ServerSideEncryptionByDefault,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerSideEncryptionByDefault {
    #[serde(rename = "SSEAlgorithm")]
    pub sse_algorithm: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicAccessBlockConfiguration {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicyProperties {
    pub bucket: Value,
    pub policy_document: PolicyDocument,
}

impl ResourceProperties for BucketPolicyProperties {
    const TYPE: &'static str = "AWS::S3::BucketPolicy";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub statement: Vec<PolicyStatement>,
    pub version: String,
}

impl PolicyDocument {
    /// Denies all access to `bucket` and its objects over plain HTTP.
    pub fn requiring_secure_transport(bucket: &LogicalId) -> PolicyDocument {
        let insecure_transport = Value::Object(BTreeMap::from([(
            "Bool".to_string(),
            Value::Object(BTreeMap::from([(
                "aws:SecureTransport".to_string(),
                Value::from("false"),
            )])),
        )]));
        let any_principal = Value::Object(BTreeMap::from([(
            "AWS".to_string(),
            Value::from("*"),
        )]));
        PolicyDocument {
            statement: vec![PolicyStatement {
                action: "s3:*".to_string(),
                condition: Some(insecure_transport),
                effect: "Deny".to_string(),
                principal: any_principal,
                resource: vec![
                    Value::get_att(bucket, "Arn"),
                    Value::sub(&format!("${{{}.Arn}}/*", bucket)),
                ],
            }],
            version: "2012-10-17".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    pub effect: String,
    pub principal: Value,
    pub resource: Vec<Value>,
}

#[cfg(test)]
mod test {
    use super::PolicyDocument;
    use crate::template::LogicalId;
    use serde_json::json;

    #[test]
    fn secure_transport_policy() {
        let bucket = LogicalId::new("DataBucket").unwrap();
        let document = PolicyDocument::requiring_secure_transport(&bucket);
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({
                "Statement": [{
                    "Action": "s3:*",
                    "Condition": {
                        "Bool": { "aws:SecureTransport": "false" },
                    },
                    "Effect": "Deny",
                    "Principal": { "AWS": "*" },
                    "Resource": [
                        { "Fn::GetAtt": ["DataBucket", "Arn"] },
                        { "Fn::Sub": "${DataBucket.Arn}/*" },
                    ],
                }],
                "Version": "2012-10-17",
            })
        );
    }
}
