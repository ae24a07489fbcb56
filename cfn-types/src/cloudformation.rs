// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CloudFormation resource properties

use crate::template::ResourceProperties;
use serde::Serialize;

/// A nested stack created from an externally hosted template.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NestedStackProperties {
    #[serde(rename = "TemplateURL")]
    pub template_url: String,
    pub timeout_in_minutes: u64,
}

impl ResourceProperties for NestedStackProperties {
    const TYPE: &'static str = "AWS::CloudFormation::Stack";
}
