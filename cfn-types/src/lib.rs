// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed model of the CloudFormation documents this workspace synthesizes
//!
//! CloudFormation consumes JSON templates: a map of logical resource ids to
//! resource declarations, plus outputs that other stacks can import.  This
//! crate provides just enough of that model for the HPC deployment to be
//! assembled as ordinary Rust values and then serialized in one shot:
//!
//! - [`Value`] covers concrete property values and the intrinsic
//!   functions the deployment uses (`Ref`, `Fn::GetAtt`, `Fn::Sub`,
//!   `Fn::ImportValue`, `Fn::Select` over `Fn::GetAZs`);
//! - [`Template`] holds resources and outputs, rejecting duplicate ids;
//! - [`Stack`] pairs a template with its deployment name and mints
//!   export/import pairs for cross-stack values;
//! - [`Assembly`] is the complete synthesized artifact, written to a
//!   directory as one `<Stack>.template.json` per stack plus a
//!   `manifest.json` describing deploy order and dependencies.
//!
//! Serialization is deterministic: resource and output maps are BTreeMaps,
//! property objects sort their keys, and nothing here records a timestamp.
//! Synthesizing the same input twice yields byte-identical files.
//!
//! The service modules ([`ec2`], [`efs`], [`fsx`], [`s3`], [`ssm`],
//! [`cloudformation`]) define property structs for exactly the resource
//! types the deployment declares, no more.

pub mod cloudformation;
pub mod ec2;
pub mod efs;
pub mod fsx;
pub mod s3;
pub mod ssm;

mod assembly;
mod template;
mod value;

pub use assembly::to_pretty_document;
pub use assembly::Assembly;
pub use assembly::AssemblyError;
pub use assembly::Manifest;
pub use assembly::ManifestStack;
pub use assembly::Stack;
pub use template::DeletionPolicy;
pub use template::LogicalId;
pub use template::Output;
pub use template::Resource;
pub use template::ResourceProperties;
pub use template::Template;
pub use value::Value;
