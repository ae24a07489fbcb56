// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static checks over a synthesized assembly
//!
//! The deployment engine only validates templates when they are applied;
//! these checks catch a class of mistakes earlier, at synthesis time:
//! imports that nothing exports, security groups open to the world,
//! storage declared without encryption, and a couple of advisory findings
//! (flow logs, bucket access logging) that a deployment may deliberately
//! suppress with a recorded reason.

mod checker;
mod checks;
mod report;

pub use checker::check_assembly;
pub use checker::Kind;
pub use checker::Note;
pub use checker::Severity;
pub use checker::Suppression;
pub use report::CheckReport;
pub use report::SuppressedNote;
