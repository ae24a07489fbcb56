// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CloudFormation property values, including intrinsic functions

use crate::template::LogicalId;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;
use std::collections::BTreeMap;

/// A CloudFormation property value
///
/// Most property values are ordinary JSON scalars and collections, but values
/// that are only known at deploy time are expressed with intrinsic functions:
/// references to resources declared in the same template, attributes of those
/// resources, values exported by other stacks, and the region's availability
/// zone list.  The `Serialize` impl emits the exact JSON encodings
/// CloudFormation expects (`{"Ref": ...}`, `{"Fn::GetAtt": [...]}`, and so
/// on), so a `Value` can appear anywhere inside a property struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    String(String),
    Bool(bool),
    UInt(u64),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// `{"Ref": "LogicalId"}`: the runtime identifier of a resource declared
    /// in the same template
    Ref(LogicalId),
    /// `{"Fn::GetAtt": ["LogicalId", "Attribute"]}`: a named attribute of a
    /// resource declared in the same template
    GetAtt { id: LogicalId, attribute: String },
    /// `{"Fn::Sub": "..."}`: string interpolation over `${LogicalId}`,
    /// `${LogicalId.Attribute}`, and pseudo parameters such as
    /// `${AWS::Region}`
    Sub(String),
    /// `{"Fn::ImportValue": "..."}`: a value exported by another stack in the
    /// same deployment
    ImportValue(String),
    /// `{"Fn::Select": [index, list]}`
    Select { index: u64, from: Box<Value> },
    /// `{"Fn::GetAZs": ""}`: the availability zones of the deployment region
    GetAzs,
}

impl Value {
    /// Returns a `Ref` to a resource declared in the same template.
    pub fn reference(id: &LogicalId) -> Value {
        Value::Ref(id.clone())
    }

    /// Returns a `Fn::GetAtt` for an attribute of a resource declared in the
    /// same template.
    pub fn get_att(id: &LogicalId, attribute: &str) -> Value {
        Value::GetAtt { id: id.clone(), attribute: attribute.to_string() }
    }

    /// Returns a `Fn::Sub` interpolation.
    pub fn sub(template: &str) -> Value {
        Value::Sub(template.to_string())
    }

    /// Returns a `Fn::ImportValue` for a value exported by another stack.
    pub fn import(export_name: &str) -> Value {
        Value::ImportValue(export_name.to_string())
    }

    /// Returns the `index`-th availability zone of the deployment region
    /// (`Fn::Select` over `Fn::GetAZs`).
    pub fn availability_zone(index: u64) -> Value {
        Value::Select { index, from: Box::new(Value::GetAzs) }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value::UInt(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Value {
        Value::List(values)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        fn intrinsic<S, T>(
            serializer: S,
            function: &str,
            argument: &T,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            T: Serialize + ?Sized,
        {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(function, argument)?;
            map.end()
        }

        match self {
            Value::String(value) => serializer.serialize_str(value),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::UInt(value) => serializer.serialize_u64(*value),
            Value::List(values) => values.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            Value::Ref(id) => intrinsic(serializer, "Ref", id),
            Value::GetAtt { id, attribute } => intrinsic(
                serializer,
                "Fn::GetAtt",
                &(id.as_str(), attribute.as_str()),
            ),
            Value::Sub(template) => {
                intrinsic(serializer, "Fn::Sub", template.as_str())
            }
            Value::ImportValue(name) => {
                intrinsic(serializer, "Fn::ImportValue", name.as_str())
            }
            Value::Select { index, from } => {
                intrinsic(serializer, "Fn::Select", &(index, from.as_ref()))
            }
            Value::GetAzs => intrinsic(serializer, "Fn::GetAZs", ""),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Value;
    use crate::template::LogicalId;
    use serde_json::json;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    #[test]
    fn scalar_encodings() {
        assert_eq!(
            serde_json::to_value(Value::from("subnet")).unwrap(),
            json!("subnet")
        );
        assert_eq!(serde_json::to_value(Value::from(true)).unwrap(), json!(true));
        assert_eq!(serde_json::to_value(Value::from(20u64)).unwrap(), json!(20));
        assert_eq!(
            serde_json::to_value(Value::List(vec![
                Value::from("a"),
                Value::from("b")
            ]))
            .unwrap(),
            json!(["a", "b"])
        );
    }

    #[test]
    fn intrinsic_encodings() {
        assert_eq!(
            serde_json::to_value(Value::reference(&id("Vpc"))).unwrap(),
            json!({ "Ref": "Vpc" })
        );
        assert_eq!(
            serde_json::to_value(Value::get_att(&id("FileSystem"), "DNSName"))
                .unwrap(),
            json!({ "Fn::GetAtt": ["FileSystem", "DNSName"] })
        );
        assert_eq!(
            serde_json::to_value(Value::sub("${Bucket.Arn}/*")).unwrap(),
            json!({ "Fn::Sub": "${Bucket.Arn}/*" })
        );
        assert_eq!(
            serde_json::to_value(Value::import("HpcNetwork:VpcId")).unwrap(),
            json!({ "Fn::ImportValue": "HpcNetwork:VpcId" })
        );
        assert_eq!(
            serde_json::to_value(Value::availability_zone(2)).unwrap(),
            json!({ "Fn::Select": [2, { "Fn::GetAZs": "" }] })
        );
    }
}
