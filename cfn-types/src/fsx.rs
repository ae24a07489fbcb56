// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FSx resource properties, covering the Lustre and OpenZFS flavors
//!
//! Both flavors share the `AWS::FSx::FileSystem` resource type, selected by
//! `FileSystemType` plus a flavor-specific configuration block; the
//! constructors here keep the two from being mixed.

use crate::template::ResourceProperties;
use crate::value::Value;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileSystemProperties {
    pub file_system_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lustre_configuration: Option<LustreConfiguration>,
    #[serde(
        rename = "OpenZFSConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    pub open_zfs_configuration: Option<OpenZfsConfiguration>,
    pub security_group_ids: Vec<Value>,
    pub storage_capacity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    pub subnet_ids: Vec<Value>,
}

impl FileSystemProperties {
    pub fn lustre(
        configuration: LustreConfiguration,
        storage_capacity: u64,
        subnet_id: Value,
        security_group_id: Value,
    ) -> FileSystemProperties {
        FileSystemProperties {
            file_system_type: "LUSTRE".to_string(),
            lustre_configuration: Some(configuration),
            open_zfs_configuration: None,
            security_group_ids: vec![security_group_id],
            storage_capacity,
            storage_type: None,
            subnet_ids: vec![subnet_id],
        }
    }

    pub fn open_zfs(
        configuration: OpenZfsConfiguration,
        storage_capacity: u64,
        subnet_id: Value,
        security_group_id: Value,
    ) -> FileSystemProperties {
        FileSystemProperties {
            file_system_type: "OPENZFS".to_string(),
            lustre_configuration: None,
            open_zfs_configuration: Some(configuration),
            security_group_ids: vec![security_group_id],
            storage_capacity,
            storage_type: Some("SSD".to_string()),
            subnet_ids: vec![subnet_id],
        }
    }
}

impl ResourceProperties for FileSystemProperties {
    const TYPE: &'static str = "AWS::FSx::FileSystem";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LustreConfiguration {
    pub data_compression_type: String,
    pub deployment_type: String,
    pub per_unit_storage_throughput: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpenZfsConfiguration {
    pub automatic_backup_retention_days: u64,
    pub copy_tags_to_backups: bool,
    pub copy_tags_to_volumes: bool,
    pub daily_automatic_backup_start_time: String,
    pub deployment_type: String,
    pub disk_iops_configuration: DiskIopsConfiguration,
    pub options: Vec<String>,
    pub root_volume_configuration: RootVolumeConfiguration,
    pub throughput_capacity: u64,
    pub weekly_maintenance_start_time: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskIopsConfiguration {
    pub mode: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RootVolumeConfiguration {
    pub copy_tags_to_snapshots: bool,
    pub data_compression_type: String,
    pub nfs_exports: Vec<NfsExport>,
    pub read_only: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NfsExport {
    pub client_configurations: Vec<ClientConfiguration>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientConfiguration {
    pub clients: String,
    pub options: Vec<String>,
}

/// Links a Lustre file system to an object-storage bucket; the sync itself
/// is performed by the managed service, this only declares the policy.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRepositoryAssociationProperties {
    pub batch_import_meta_data_on_create: bool,
    pub data_repository_path: Value,
    pub file_system_id: Value,
    pub file_system_path: String,
    pub imported_file_chunk_size: u64,
    pub s3: S3AutoPolicies,
}

impl ResourceProperties for DataRepositoryAssociationProperties {
    const TYPE: &'static str = "AWS::FSx::DataRepositoryAssociation";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3AutoPolicies {
    pub auto_export_policy: EventPolicy,
    pub auto_import_policy: EventPolicy,
}

impl S3AutoPolicies {
    /// Export and import policies covering the same event set in both
    /// directions.
    pub fn bidirectional(events: &[&str]) -> S3AutoPolicies {
        let events: Vec<String> =
            events.iter().map(|e| e.to_string()).collect();
        S3AutoPolicies {
            auto_export_policy: EventPolicy { events: events.clone() },
            auto_import_policy: EventPolicy { events },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventPolicy {
    pub events: Vec<String>,
}
