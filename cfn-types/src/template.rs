// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Templates: resources, outputs, and their assembly rules

use crate::value::Value;
use anyhow::anyhow;
use anyhow::ensure;
use anyhow::Context;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;
use std::collections::BTreeMap;
use std::fmt;

/// Template format version emitted in every synthesized template.
const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// The logical id of a resource within one template
///
/// CloudFormation requires alphanumeric logical ids.  Ids are minted by
/// [`Template::resource`], which validates them and guarantees uniqueness
/// within the template; holding a `LogicalId` is proof the resource exists,
/// which is what makes [`Value::reference`] and [`Value::get_att`] safe to
/// construct.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: &str) -> anyhow::Result<LogicalId> {
        ensure!(!id.is_empty(), "logical id must not be empty");
        ensure!(
            id.chars().all(|c| c.is_ascii_alphanumeric()),
            "logical id {:?} must be ASCII alphanumeric",
            id
        );
        Ok(LogicalId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for LogicalId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

/// What CloudFormation does with a resource when its stack is deleted or the
/// resource is replaced during an update
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
}

/// Property structs that know their CloudFormation resource type name
///
/// Implemented by the structs in the service modules; lets
/// [`Resource::new`] derive the `Type` field instead of taking a stringly
/// type name at every call site.
pub trait ResourceProperties: Serialize {
    const TYPE: &'static str;
}

/// One resource declaration
///
/// Properties are captured as a serialized JSON tree (with sorted keys, for
/// deterministic output) at construction time, so a `Resource` is immutable
/// and self-contained once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(rename = "Properties", skip_serializing_if = "Option::is_none")]
    properties: Option<serde_json::Value>,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<LogicalId>,
    #[serde(
        rename = "UpdateReplacePolicy",
        skip_serializing_if = "Option::is_none"
    )]
    update_replace_policy: Option<DeletionPolicy>,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    deletion_policy: Option<DeletionPolicy>,
}

impl Resource {
    /// Declares a resource of `P`'s CloudFormation type.
    pub fn new<P: ResourceProperties>(properties: &P) -> anyhow::Result<Resource> {
        Resource::of_type(P::TYPE, properties)
    }

    /// Declares a resource of an explicitly named type, for custom resource
    /// types (`Custom::*`) that are not bound to a property struct.
    pub fn of_type(
        resource_type: &str,
        properties: &impl Serialize,
    ) -> anyhow::Result<Resource> {
        let properties = serde_json::to_value(properties).with_context(|| {
            format!("serializing properties for {:?}", resource_type)
        })?;
        Ok(Resource {
            resource_type: resource_type.to_string(),
            properties: Some(properties),
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
        })
    }

    /// Declares a resource with no properties (e.g. an internet gateway).
    pub fn without_properties(resource_type: &str) -> Resource {
        Resource {
            resource_type: resource_type.to_string(),
            properties: None,
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
        }
    }

    /// Adds an explicit creation-ordering dependency on another resource in
    /// the same template.
    pub fn depends_on(mut self, id: &LogicalId) -> Resource {
        self.depends_on.push(id.clone());
        self
    }

    /// Marks the resource to be deleted with its stack (and on replacement).
    pub fn deleted_with_stack(mut self) -> Resource {
        self.update_replace_policy = Some(DeletionPolicy::Delete);
        self.deletion_policy = Some(DeletionPolicy::Delete);
        self
    }

    /// Marks the resource to survive stack deletion and replacement.
    pub fn retained(mut self) -> Resource {
        self.update_replace_policy = Some(DeletionPolicy::Retain);
        self.deletion_policy = Some(DeletionPolicy::Retain);
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> Option<&serde_json::Value> {
        self.properties.as_ref()
    }

    /// Looks up a property by name, if properties were declared.
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    pub fn deletion_policy(&self) -> Option<DeletionPolicy> {
        self.deletion_policy
    }
}

/// One template output, optionally exported for other stacks to import
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Output {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "Value")]
    value: Value,
    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    export: Option<Export>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Export {
    #[serde(rename = "Name")]
    name: String,
}

impl Output {
    pub fn new(value: Value) -> Output {
        Output { description: None, value, export: None }
    }

    pub fn description(mut self, description: &str) -> Output {
        self.description = Some(description.to_string());
        self
    }

    pub fn exported(mut self, export_name: &str) -> Output {
        self.export = Some(Export { name: export_name.to_string() });
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn export_name(&self) -> Option<&str> {
        self.export.as_ref().map(|e| e.name.as_str())
    }
}

/// One CloudFormation template: a map of logical ids to resources plus
/// outputs
///
/// The add-methods reject duplicates, so each logical id and output name
/// appears exactly once.  Iteration order (and therefore serialized order) is
/// the BTreeMap key order.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    description: Option<String>,
    resources: BTreeMap<LogicalId, Resource>,
    outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: &str) -> Template {
        Template {
            description: Some(description.to_string()),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Adds a resource under `id`, returning the minted [`LogicalId`] for
    /// use in `Ref`/`Fn::GetAtt` values and `DependsOn` edges.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not a valid logical id or is already declared in this
    /// template.
    pub fn resource(
        &mut self,
        id: &str,
        resource: Resource,
    ) -> anyhow::Result<LogicalId> {
        let id = LogicalId::new(id)?;
        match self.resources.insert(id.clone(), resource) {
            None => Ok(id),
            Some(previous) => Err(anyhow!(
                "duplicate resource {:?} (previously declared as {})",
                id.as_str(),
                previous.resource_type(),
            )),
        }
    }

    /// Adds an output under `name`.
    ///
    /// # Errors
    ///
    /// Fails if an output named `name` is already declared.
    pub fn output(&mut self, name: &str, output: Output) -> anyhow::Result<()> {
        match self.outputs.insert(name.to_string(), output) {
            None => Ok(()),
            Some(_) => Err(anyhow!("duplicate output {:?}", name)),
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter()
    }

    /// Iterates the resources of one CloudFormation type.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type() == resource_type)
    }

    pub fn get_resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&String, &Output)> {
        self.outputs.iter()
    }

    pub fn get_output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(
            "AWSTemplateFormatVersion",
            TEMPLATE_FORMAT_VERSION,
        )?;
        if let Some(description) = &self.description {
            map.serialize_entry("Description", description)?;
        }
        map.serialize_entry("Resources", &self.resources)?;
        if !self.outputs.is_empty() {
            map.serialize_entry("Outputs", &self.outputs)?;
        }
        map.end()
    }
}
