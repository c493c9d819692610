use crate::engine::is_canonical_uuid;
use crate::error::{RekeyError, Result};
use rustc_hash::FxHashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// A broken row-alignment rule, with its 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    LengthMismatch { ids: usize, events: usize },
    MalformedId { row: usize, id: String },
    IdNotInRecord { row: usize, id: String },
    DuplicateId { row: usize, id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LengthMismatch { ids, events } => {
                write!(f, "{} ids but {} events", ids, events)
            }
            Violation::MalformedId { row, id } => write!(f, "row {}: malformed id {}", row, id),
            Violation::IdNotInRecord { row, id } => {
                write!(f, "row {}: id {} not found in its event", row, id)
            }
            Violation::DuplicateId { row, id } => write!(f, "row {}: duplicate id {}", row, id),
        }
    }
}

#[derive(Debug, Default)]
pub struct AuditReport {
    pub rows: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let read_err = |source| RekeyError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_err)
}

/// Checks a finished run's output files against each other.
pub fn audit_output(ids_path: &Path, events_path: &Path) -> Result<AuditReport> {
    let ids = read_lines(ids_path)?;
    let events = read_lines(events_path)?;
    let report = audit_rows(&ids, &events);

    info!(
        rows = report.rows,
        violations = report.violations.len(),
        "Audit complete"
    );
    Ok(report)
}

pub fn audit_rows(ids: &[String], events: &[String]) -> AuditReport {
    let mut violations = Vec::new();
    if ids.len() != events.len() {
        violations.push(Violation::LengthMismatch {
            ids: ids.len(),
            events: events.len(),
        });
    }

    let mut seen = FxHashSet::default();
    for (idx, (id, event)) in ids.iter().zip(events).enumerate() {
        let row = idx + 1;
        if !is_canonical_uuid(id) {
            violations.push(Violation::MalformedId {
                row,
                id: id.clone(),
            });
        }
        if !event.contains(id.as_str()) {
            violations.push(Violation::IdNotInRecord {
                row,
                id: id.clone(),
            });
        }
        if !seen.insert(id.as_str()) {
            violations.push(Violation::DuplicateId {
                row,
                id: id.clone(),
            });
        }
    }

    AuditReport {
        rows: ids.len().min(events.len()),
        violations,
    }
}
