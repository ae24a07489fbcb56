// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EFS resource properties

use crate::template::ResourceProperties;
use crate::value::Value;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileSystemProperties {
    pub backup_policy: BackupPolicy,
    pub encrypted: bool,
    pub performance_mode: String,
}

impl FileSystemProperties {
    /// An encrypted general-purpose file system with automatic backups.
    pub fn general_purpose() -> FileSystemProperties {
        FileSystemProperties {
            backup_policy: BackupPolicy { status: "ENABLED".to_string() },
            encrypted: true,
            performance_mode: "generalPurpose".to_string(),
        }
    }
}

impl ResourceProperties for FileSystemProperties {
    const TYPE: &'static str = "AWS::EFS::FileSystem";
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackupPolicy {
    pub status: String,
}

/// One mount target per subnet the file system is reachable from.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountTargetProperties {
    pub file_system_id: Value,
    pub security_groups: Vec<Value>,
    pub subnet_id: Value,
}

impl ResourceProperties for MountTargetProperties {
    const TYPE: &'static str = "AWS::EFS::MountTarget";
}
