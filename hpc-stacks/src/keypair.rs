// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The key-pair stack: the administrative key plus a break-glass fallback
//!
//! The administrative key is imported from caller-supplied public key
//! material, so the private half never touches this system.  The
//! break-glass key is generated at creation time; the platform stores its
//! private key in the parameter store under `/ec2/keypair/<key pair id>`.

use cfn_types::ec2::KeyPairProperties;
use cfn_types::Resource;
use cfn_types::Stack;
use hpc_config::DeployConfig;

pub const STACK_NAME: &str = "HpcKeypairs";

/// Fixed name of the generated fallback key pair.
pub const BREAK_GLASS_KEY_NAME: &str = "BreakGlass";

pub fn build(config: &DeployConfig) -> anyhow::Result<Stack> {
    let mut stack =
        Stack::new(STACK_NAME, "SSH key pairs for cluster access")?;
    stack.template_mut().resource(
        "AdminKeyPair",
        Resource::new(&KeyPairProperties::imported(
            &config.key_name,
            &config.key_material,
        ))?,
    )?;
    stack.template_mut().resource(
        "BreakGlassKeyPair",
        Resource::new(&KeyPairProperties::generated(BREAK_GLASS_KEY_NAME))?,
    )?;
    Ok(stack)
}
