// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named stacks and the on-disk layout of a synthesized deployment

use crate::template::Output;
use crate::template::Template;
use crate::value::Value;
use anyhow::anyhow;
use anyhow::ensure;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;

/// One named stack: a [`Template`] plus the deployment-wide name under which
/// it is created
///
/// The name doubles as the namespace for cross-stack exports: an output
/// exported through [`Stack::export`] is published as `<stack>:<output>`,
/// and the returned [`Value`] imports it by that name.  Consumers therefore
/// never spell export names by hand, which keeps producer and consumer in
/// agreement by construction.
#[derive(Clone, Debug)]
pub struct Stack {
    name: String,
    template: Template,
}

impl Stack {
    pub fn new(name: &str, description: &str) -> anyhow::Result<Stack> {
        ensure!(!name.is_empty(), "stack name must not be empty");
        ensure!(
            name.starts_with(|c: char| c.is_ascii_alphabetic())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
            "stack name {:?} must start with a letter and contain only \
             letters, digits, and hyphens",
            name
        );
        Ok(Stack { name: name.to_string(), template: Template::new(description) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut Template {
        &mut self.template
    }

    /// Adds `output` to this stack's template, exported as
    /// `<stack>:<output>`, and returns the import token for other stacks.
    pub fn export(&mut self, name: &str, output: Output) -> anyhow::Result<Value> {
        let export_name = format!("{}:{}", self.name, name);
        self.template.output(name, output.exported(&export_name))?;
        Ok(Value::import(&export_name))
    }

    /// The file this stack's template is written to by
    /// [`Assembly::write_to_dir`].
    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.name)
    }
}

/// The full set of synthesized stacks, in creation order
#[derive(Debug, Default)]
pub struct Assembly {
    stacks: Vec<Stack>,
    environment: Option<String>,
}

impl Assembly {
    pub fn new() -> Assembly {
        Assembly { stacks: Vec::new(), environment: None }
    }

    /// Records the deployment environment in the manifest as
    /// `aws://<account>/<region>`.
    pub fn record_environment(&mut self, account: &str, region: &str) {
        self.environment = Some(format!("aws://{}/{}", account, region));
    }

    /// Adds a stack to the assembly.  Stacks are written (and listed in the
    /// manifest) in the order they were added, which is the order they
    /// should be created in: imports only resolve once the exporting stack
    /// exists.
    pub fn add_stack(&mut self, stack: Stack) -> anyhow::Result<()> {
        if self.stacks.iter().any(|s| s.name() == stack.name()) {
            return Err(anyhow!("duplicate stack {:?}", stack.name()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.iter()
    }

    pub fn get_stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Summarizes the assembly for the manifest file.  Each stack's
    /// dependencies are derived from the import tokens in its resource
    /// properties: importing `<stack>:<output>` makes `<stack>` a
    /// dependency.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            environment: self.environment.clone(),
            stacks: self
                .stacks
                .iter()
                .map(|stack| ManifestStack {
                    name: stack.name().to_string(),
                    template: stack.template_file_name(),
                    resources: stack.template().resource_count(),
                    exports: stack
                        .template()
                        .outputs()
                        .filter_map(|(_, output)| {
                            output.export_name().map(str::to_string)
                        })
                        .collect(),
                    dependencies: dependencies_of(stack.template()),
                })
                .collect(),
        }
    }

    /// Writes one `<stack>.template.json` per stack plus `manifest.json`
    /// into `dir` (created if necessary), returning the paths written.
    pub fn write_to_dir(
        &self,
        dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, AssemblyError> {
        fs::create_dir_all(dir)
            .map_err(|err| AssemblyError::Io { path: dir.to_owned(), err })?;
        let mut written = Vec::new();
        for stack in &self.stacks {
            let contents =
                to_pretty_document(stack.template()).map_err(|err| {
                    AssemblyError::Serialize {
                        stack: stack.name().to_string(),
                        err,
                    }
                })?;
            let path = dir.join(stack.template_file_name());
            fs::write(&path, contents)
                .map_err(|err| AssemblyError::Io { path: path.clone(), err })?;
            written.push(path);
        }
        let contents = to_pretty_document(&self.manifest()).map_err(|err| {
            AssemblyError::Serialize { stack: "manifest".to_string(), err }
        })?;
        let path = dir.join("manifest.json");
        fs::write(&path, contents)
            .map_err(|err| AssemblyError::Io { path: path.clone(), err })?;
        written.push(path);
        Ok(written)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("writing {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("serializing template for stack {stack:?}")]
    Serialize {
        stack: String,
        #[source]
        err: serde_json::Error,
    },
}

/// Index of a written assembly: which stacks exist, where their templates
/// landed, what each one exports, and which earlier stacks it depends on
#[derive(Debug, Serialize)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub stacks: Vec<ManifestStack>,
}

#[derive(Debug, Serialize)]
pub struct ManifestStack {
    pub name: String,
    pub template: String,
    pub resources: usize,
    pub exports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

fn dependencies_of(template: &Template) -> Vec<String> {
    let mut imports = BTreeSet::new();
    for (_, resource) in template.resources() {
        if let Some(properties) = resource.properties() {
            collect_imports(properties, &mut imports);
        }
    }
    imports
        .iter()
        .filter_map(|name| name.split_once(':'))
        .map(|(stack, _)| stack.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn collect_imports(value: &serde_json::Value, imports: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(serde_json::Value::String(name)) =
                    map.get("Fn::ImportValue")
                {
                    imports.insert(name.clone());
                    return;
                }
            }
            for entry in map.values() {
                collect_imports(entry, imports);
            }
        }
        serde_json::Value::Array(entries) => {
            for entry in entries {
                collect_imports(entry, imports);
            }
        }
        _ => (),
    }
}

/// Renders `value` the way assembly files are written: pretty-printed with
/// sorted keys and a trailing newline.
pub fn to_pretty_document<T: Serialize>(
    value: &T,
) -> Result<String, serde_json::Error> {
    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    Ok(contents)
}
