// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SSM parameter store resource properties

use crate::template::ResourceProperties;
use crate::value::Value;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterProperties {
    pub name: String,
    #[serde(rename = "Type")]
    pub parameter_type: String,
    pub value: Value,
}

impl ParameterProperties {
    pub fn string(name: &str, value: Value) -> ParameterProperties {
        ParameterProperties {
            name: name.to_string(),
            parameter_type: "String".to_string(),
            value,
        }
    }
}

impl ResourceProperties for ParameterProperties {
    const TYPE: &'static str = "AWS::SSM::Parameter";
}
