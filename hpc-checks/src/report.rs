// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reporting the outcome of a run of checks.

use crate::checker::Note;
use crate::checker::Severity;
use std::fmt;

/// A note that matched a suppression, kept so reports can still show what
/// was waved through and why.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SuppressedNote {
    pub note: Note,
    pub reason: String,
}

/// Everything a run of checks found, split into live findings and
/// suppressed ones.
#[derive(Clone, Debug)]
pub struct CheckReport {
    pub(crate) notes: Vec<Note>,
    pub(crate) suppressed: Vec<SuppressedNote>,
}

impl CheckReport {
    /// Findings not matched by any suppression, ordered by stack.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn suppressed(&self) -> &[SuppressedNote] {
        &self.suppressed
    }

    /// True if any live finding is fatal.
    pub fn has_fatal_notes(&self) -> bool {
        self.notes.iter().any(|n| n.severity == Severity::Fatal)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.notes.is_empty() && self.suppressed.is_empty() {
            return writeln!(f, "no findings");
        }
        for note in &self.notes {
            writeln!(f, "{}", note)?;
        }
        for suppressed in &self.suppressed {
            writeln!(
                f,
                "suppressed: {} [{}]",
                suppressed.note, suppressed.reason
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Kind;

    fn warning() -> Note {
        Note {
            stack: "HpcNetwork".to_string(),
            severity: Severity::Warning,
            kind: Kind::MissingFlowLogs,
        }
    }

    #[test]
    fn fatal_notes_gate_on_live_findings_only() {
        let fatal = Note {
            stack: "HpcCluster".to_string(),
            severity: Severity::Fatal,
            kind: Kind::DanglingImport {
                export_name: "HpcNetwork:VpcId".to_string(),
            },
        };

        let clean = CheckReport { notes: vec![], suppressed: vec![] };
        assert!(!clean.has_fatal_notes());

        let warned = CheckReport { notes: vec![warning()], suppressed: vec![] };
        assert!(!warned.has_fatal_notes());

        let failed = CheckReport {
            notes: vec![warning(), fatal.clone()],
            suppressed: vec![],
        };
        assert!(failed.has_fatal_notes());

        // A suppressed fatal note does not fail the run.
        let excused = CheckReport {
            notes: vec![],
            suppressed: vec![SuppressedNote {
                note: fatal,
                reason: "known break in a lab environment".to_string(),
            }],
        };
        assert!(!excused.has_fatal_notes());
    }

    #[test]
    fn display_names_stack_kind_and_code() {
        let report = CheckReport {
            notes: vec![warning()],
            suppressed: vec![SuppressedNote {
                note: Note {
                    stack: "HpcLustreStack".to_string(),
                    severity: Severity::Warning,
                    kind: Kind::MissingAccessLogging {
                        bucket: "Bucket".to_string(),
                    },
                },
                reason: "scratch data only".to_string(),
            }],
        };
        let printed = report.to_string();
        assert_eq!(
            printed,
            "warning: HpcNetwork: VPC has no flow logs (flow-logs)\n\
             suppressed: warning: HpcLustreStack: bucket Bucket has no \
             server access logging (bucket-access-logs) [scratch data only]\n"
        );

        let clean = CheckReport { notes: vec![], suppressed: vec![] };
        assert_eq!(clean.to_string(), "no findings\n");
    }
}
