// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::checks;
use crate::report::CheckReport;
use crate::report::SuppressedNote;
use cfn_types::Assembly;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Advisory; worth a look but does not block a deployment.
    Warning,
    /// Indicator of a serious problem: the assembly is invalid, and handing
    /// it to the deployment engine will either fail outright or deploy
    /// something broken.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// The specific problem a note reports
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    /// A template imports a value no earlier stack exports.
    DanglingImport { export_name: String },
    /// A security group rule admits the whole internet.
    OpenIngress { resource: String },
    /// A VPC is declared without flow logs.
    MissingFlowLogs,
    /// A bucket is declared without server access logging.
    MissingAccessLogging { bucket: String },
    /// A bucket does not block all four public access paths.
    PublicAccessNotBlocked { bucket: String },
    /// A bucket has no policy denying access over insecure transport.
    SslNotEnforced { bucket: String },
    /// A file system is not encrypted at rest.
    UnencryptedFileSystem { file_system: String },
}

impl Kind {
    /// Stable identifier used to suppress findings of this kind.
    pub fn code(&self) -> &'static str {
        match self {
            Kind::DanglingImport { .. } => "dangling-import",
            Kind::OpenIngress { .. } => "open-ingress",
            Kind::MissingFlowLogs => "flow-logs",
            Kind::MissingAccessLogging { .. } => "bucket-access-logs",
            Kind::PublicAccessNotBlocked { .. } => "bucket-public-access",
            Kind::SslNotEnforced { .. } => "bucket-ssl",
            Kind::UnencryptedFileSystem { .. } => "unencrypted-file-system",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::DanglingImport { export_name } => {
                write!(f, "imports {:?} which no earlier stack exports", export_name)
            }
            Kind::OpenIngress { resource } => {
                write!(f, "security group rule {} admits 0.0.0.0/0", resource)
            }
            Kind::MissingFlowLogs => {
                write!(f, "VPC has no flow logs")
            }
            Kind::MissingAccessLogging { bucket } => {
                write!(f, "bucket {} has no server access logging", bucket)
            }
            Kind::PublicAccessNotBlocked { bucket } => {
                write!(f, "bucket {} does not block all public access", bucket)
            }
            Kind::SslNotEnforced { bucket } => {
                write!(
                    f,
                    "bucket {} has no policy denying insecure transport",
                    bucket
                )
            }
            Kind::UnencryptedFileSystem { file_system } => {
                write!(f, "file system {} is not encrypted at rest", file_system)
            }
        }
    }
}

/// One finding against one stack
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Note {
    pub stack: String,
    pub severity: Severity,
    pub kind: Kind,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {} ({})",
            self.severity,
            self.stack,
            self.kind,
            self.kind.code()
        )
    }
}

/// Accepts findings of one kind against one stack, with a recorded reason
#[derive(Clone, Debug, PartialEq)]
pub struct Suppression {
    pub stack: String,
    pub code: String,
    pub reason: String,
}

impl Suppression {
    pub fn new(stack: &str, code: &str, reason: &str) -> Suppression {
        Suppression {
            stack: stack.to_string(),
            code: code.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Runs every check against `assembly`, filing findings matched by a
/// suppression separately so the report can still show them.
pub fn check_assembly(
    assembly: &Assembly,
    suppressions: &[Suppression],
) -> CheckReport {
    let mut checker = Checker {
        assembly,
        suppressions,
        notes: Vec::new(),
        suppressed: Vec::new(),
    };
    checks::perform_all_checks(&mut checker);
    checker.notes.sort();
    checker.suppressed.sort();
    CheckReport { notes: checker.notes, suppressed: checker.suppressed }
}

pub(crate) struct Checker<'a> {
    assembly: &'a Assembly,
    suppressions: &'a [Suppression],
    notes: Vec<Note>,
    suppressed: Vec<SuppressedNote>,
}

impl<'a> Checker<'a> {
    pub(crate) fn assembly(&self) -> &'a Assembly {
        self.assembly
    }

    pub(crate) fn note(&mut self, stack: &str, severity: Severity, kind: Kind) {
        let note = Note { stack: stack.to_string(), severity, kind };
        let suppression = self.suppressions.iter().find(|s| {
            s.stack == note.stack && s.code == note.kind.code()
        });
        match suppression {
            Some(suppression) => self.suppressed.push(SuppressedNote {
                note,
                reason: suppression.reason.clone(),
            }),
            None => self.notes.push(note),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfn_types::Resource;
    use cfn_types::Stack;
    use serde_json::json;

    fn assembly_with_bare_vpc(stack_name: &str) -> Assembly {
        let mut stack = Stack::new(stack_name, "a VPC without flow logs")
            .expect("valid stack name");
        stack
            .template_mut()
            .resource(
                "Vpc",
                Resource::of_type(
                    "AWS::EC2::VPC",
                    &json!({ "CidrBlock": "10.0.0.0/16" }),
                )
                .expect("serializable properties"),
            )
            .expect("fresh logical id");
        let mut assembly = Assembly::new();
        assembly.add_stack(stack).expect("fresh stack name");
        assembly
    }

    #[test]
    fn suppressions_match_on_stack_and_code() {
        let assembly = assembly_with_bare_vpc("Net");

        // Matching suppression: the note moves aside, reason attached.
        let matching =
            [Suppression::new("Net", "flow-logs", "lab environment")];
        let report = check_assembly(&assembly, &matching);
        assert!(report.notes().is_empty());
        assert_eq!(report.suppressed().len(), 1);
        assert_eq!(report.suppressed()[0].note.kind, Kind::MissingFlowLogs);
        assert_eq!(report.suppressed()[0].reason, "lab environment");

        // Same code, different stack: the note stays live.
        let elsewhere =
            [Suppression::new("Other", "flow-logs", "lab environment")];
        let report = check_assembly(&assembly, &elsewhere);
        assert_eq!(report.notes().len(), 1);
        assert!(report.suppressed().is_empty());

        // Same stack, different code: the note stays live.
        let wrong_code =
            [Suppression::new("Net", "open-ingress", "lab environment")];
        let report = check_assembly(&assembly, &wrong_code);
        assert_eq!(report.notes().len(), 1);
        assert!(report.suppressed().is_empty());
    }

    #[test]
    fn note_rendering() {
        let note = Note {
            stack: "HpcCluster".to_string(),
            severity: Severity::Fatal,
            kind: Kind::DanglingImport {
                export_name: "HpcNetwork:VpcId".to_string(),
            },
        };
        assert_eq!(
            note.to_string(),
            "fatal: HpcCluster: imports \"HpcNetwork:VpcId\" which no \
             earlier stack exports (dangling-import)"
        );
    }
}
