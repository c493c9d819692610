//! Matching and rewriting of event records.
//!
//! For every identifier the engine searches the whole corpus for one record
//! carrying it, mints a fresh UUID and rewrites that record. Identifiers are
//! resolved in parallel and each candidate search is itself parallel, so
//! which record wins when several match is implementation-defined and may
//! change from run to run.

use crate::config::UUID_TEXT_LEN;
use crate::error::{RekeyError, Result};
use crate::models::{Candidate, Mode, Replacement};
use crate::stats::RunStats;
use dashmap::DashSet;
use memchr::memmem;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};
use uuid::Uuid;

/// `"event_id"` field holding a canonical UUID; group 1 is the value.
pub static EVENT_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""event_id"\s*:\s*"([a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})""#,
    )
    .unwrap()
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}$",
    )
    .unwrap()
});

/// True when `s` has the 8-4-4-4-12 hex shape.
pub fn is_canonical_uuid(s: &str) -> bool {
    s.len() == UUID_TEXT_LEN && UUID_REGEX.is_match(s)
}

/// Hands out random identifiers that never repeat within a run and never
/// equal one of the run's input identifiers.
pub struct IdMinter {
    reserved: FxHashSet<String>,
    issued: DashSet<Uuid>,
}

impl IdMinter {
    pub fn new<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            reserved: reserved.into_iter().map(str::to_string).collect(),
            issued: DashSet::new(),
        }
    }

    pub fn mint(&self) -> String {
        loop {
            let id = Uuid::new_v4();
            let text = id.to_string();
            if self.reserved.contains(&text) || !self.issued.insert(id) {
                debug!(id = %text, "Generated identifier already in use, retrying");
                continue;
            }
            return text;
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

/// Finds one record matching `identifier` under `mode`.
pub fn find_candidate<'a>(
    identifier: &'a str,
    records: &'a [String],
    mode: Mode,
) -> Option<Candidate<'a>> {
    let finder = memmem::Finder::new(identifier.as_bytes());
    let record = match mode {
        Mode::Literal => records
            .par_iter()
            .find_any(|record| finder.find(record.as_bytes()).is_some()),
        Mode::Structured => records.par_iter().find_any(|record| {
            finder.find(record.as_bytes()).is_some() && has_event_id(record, identifier)
        }),
    }?;
    Some(Candidate {
        identifier,
        record: record.as_str(),
    })
}

/// True when `record` carries `"event_id":"<identifier>"`.
///
/// The same value under any other field name does not count.
pub fn has_event_id(record: &str, identifier: &str) -> bool {
    EVENT_ID_REGEX
        .captures_iter(record)
        .any(|caps| &caps[1] == identifier)
}

/// Replaces every occurrence of the candidate's identifier with `new_id`.
pub fn rewrite_literal(candidate: Candidate<'_>, new_id: &str) -> String {
    candidate.record.replace(candidate.identifier, new_id)
}

/// Rewrites the first `event_id` field of the record, then every other
/// verbatim occurrence of its old value.
///
/// The first field is taken even when a later `event_id` field is the one
/// that matched the identifier. Only that field's value is replaced, so
/// `event_id` fields holding a different value are left as they are and the
/// matched identifier stays in the output when it was not in the first field.
pub fn rewrite_structured(candidate: Candidate<'_>, new_id: &str) -> Result<String> {
    let caps = EVENT_ID_REGEX.captures(candidate.record).ok_or_else(|| {
        RekeyError::EventIdFieldMissing {
            identifier: candidate.identifier.to_string(),
            record: candidate.record.to_string(),
        }
    })?;
    let old_id = &caps[1];
    if old_id != candidate.identifier {
        debug!(
            identifier = candidate.identifier,
            rewritten = old_id,
            "First event_id field differs from the matched identifier"
        );
    }
    Ok(candidate.record.replace(old_id, new_id))
}

/// Rewrites one candidate under `mode` with a freshly minted identifier.
pub fn rewrite(candidate: Candidate<'_>, mode: Mode, minter: &IdMinter) -> Result<Replacement> {
    let new_id = minter.mint();
    let record = match mode {
        Mode::Literal => rewrite_literal(candidate, &new_id),
        Mode::Structured => rewrite_structured(candidate, &new_id)?,
    };
    trace!(old = candidate.identifier, new = %new_id, "Record rewritten");
    Ok(Replacement { new_id, record })
}

/// Resolves every identifier against the corpus.
///
/// Nothing runs until the returned iterator is driven. Identifiers that match
/// no record (and empty identifiers, which would match everything) produce
/// nothing and are counted as unmatched in `stats`.
pub fn resolve<'a>(
    records: &'a [String],
    identifiers: &'a [String],
    mode: Mode,
    minter: &'a IdMinter,
    stats: &'a RunStats,
) -> impl ParallelIterator<Item = Result<Replacement>> + 'a {
    identifiers.par_iter().filter_map(move |identifier| {
        if identifier.is_empty() {
            stats.inc_unmatched();
            return None;
        }
        match find_candidate(identifier, records, mode) {
            Some(candidate) => {
                stats.inc_resolved();
                Some(rewrite(candidate, mode, minter))
            }
            None => {
                debug!(identifier = identifier.as_str(), "No record found");
                stats.inc_unmatched();
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "11111111-1111-1111-1111-111111111111";
    const OTHER: &str = "22222222-2222-2222-2222-222222222222";

    fn records(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    fn run(records: &[String], ids: &[String], mode: Mode) -> Vec<Replacement> {
        let minter = IdMinter::new(ids.iter().map(String::as_str));
        let stats = RunStats::new();
        resolve(records, ids, mode, &minter, &stats)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn uuid_shape() {
        assert!(is_canonical_uuid(ID));
        assert!(is_canonical_uuid("ABCDEF01-2345-6789-abcd-ef0123456789"));
        assert!(!is_canonical_uuid("11111111111111111111111111111111"));
        assert!(!is_canonical_uuid("1111111-1111-1111-1111-111111111111"));
        assert!(!is_canonical_uuid("g1111111-1111-1111-1111-111111111111"));
    }

    #[test]
    fn event_id_allows_whitespace_around_colon() {
        let record = format!(r#"{{"event_id" :  "{ID}"}}"#);
        assert!(has_event_id(&record, ID));
    }

    #[test]
    fn event_id_ignores_decoy_field() {
        let record = format!(r#"{{"triggering_system_event_id":"{ID}"}}"#);
        assert!(!has_event_id(&record, ID));
    }

    #[test]
    fn event_id_requires_uuid_shaped_value() {
        let record = r#"{"event_id":"abc"}"#;
        assert!(!has_event_id(record, "abc"));
    }

    #[test]
    fn event_id_is_case_sensitive() {
        let upper = ID.replace('1', "A");
        let record = format!(r#"{{"event_id":"{upper}"}}"#);
        assert!(!has_event_id(&record, &upper.to_lowercase()));
        assert!(has_event_id(&record, &upper));
    }

    #[test]
    fn literal_candidate_is_substring_match() {
        let corpus = records(&["alpha", "xx-beta-yy", "gamma"]);
        let candidate = find_candidate("beta", &corpus, Mode::Literal).unwrap();
        assert_eq!(candidate.record, "xx-beta-yy");
        assert!(find_candidate("delta", &corpus, Mode::Literal).is_none());
    }

    #[test]
    fn structured_candidate_skips_decoy_record() {
        let corpus = records(&[
            &format!(r#"{{"triggering_system_event_id":"{ID}"}}"#),
            &format!(r#"{{"event_id":"{ID}","n":2}}"#),
        ]);
        let candidate = find_candidate(ID, &corpus, Mode::Structured).unwrap();
        assert_eq!(candidate.record, corpus[1]);
    }

    #[test]
    fn literal_rewrite_replaces_every_occurrence() {
        let record = format!("{ID} and again {ID}");
        let out = rewrite_literal(
            Candidate {
                identifier: ID,
                record: &record,
            },
            OTHER,
        );
        assert_eq!(out, format!("{OTHER} and again {OTHER}"));
    }

    #[test]
    fn structured_rewrite_replaces_value_everywhere() {
        let record = format!(
            r#"{{"event_id":"{ID}","triggering_system_event_id":"{ID}","meta":{{"event_id" : "{ID}"}}}}"#
        );
        let out = rewrite_structured(
            Candidate {
                identifier: ID,
                record: &record,
            },
            OTHER,
        )
        .unwrap();
        assert_eq!(out, record.replace(ID, OTHER));
        assert!(!out.contains(ID));
    }

    #[test]
    fn structured_rewrite_targets_first_event_id_field() {
        let record = format!(r#"{{"event_id":"{OTHER}","meta":{{"event_id":"{ID}"}}}}"#);
        let new_id = "33333333-3333-3333-3333-333333333333";
        let out = rewrite_structured(
            Candidate {
                identifier: ID,
                record: &record,
            },
            new_id,
        )
        .unwrap();
        assert_eq!(
            out,
            format!(r#"{{"event_id":"{new_id}","meta":{{"event_id":"{ID}"}}}}"#)
        );
    }

    #[test]
    fn structured_rewrite_without_field_is_distinct_error() {
        let record = format!(r#"{{"id":"{ID}"}}"#);
        let err = rewrite_structured(
            Candidate {
                identifier: ID,
                record: &record,
            },
            OTHER,
        )
        .unwrap_err();
        assert!(matches!(
            &err,
            RekeyError::EventIdFieldMissing { identifier, .. } if identifier == ID
        ));
        assert!(err.to_string().contains(ID));
    }

    #[test]
    fn end_to_end_structured() {
        let corpus = records(&[&format!(r#"{{"event_id":"{ID}","x":1}}"#)]);
        let ids = records(&[ID]);
        let out = run(&corpus, &ids, Mode::Structured);

        assert_eq!(out.len(), 1);
        let new_id = &out[0].new_id;
        assert_eq!(new_id.len(), 36);
        assert!(is_canonical_uuid(new_id));
        assert_ne!(new_id, ID);
        assert_eq!(out[0].record, format!(r#"{{"event_id":"{new_id}","x":1}}"#));
    }

    #[test]
    fn decoy_only_structured_yields_nothing_literal_yields_one() {
        let corpus = records(&[&format!(r#"{{"triggering_system_event_id":"{ID}"}}"#)]);
        let ids = records(&[ID]);

        assert!(run(&corpus, &ids, Mode::Structured).is_empty());

        let literal = run(&corpus, &ids, Mode::Literal);
        assert_eq!(literal.len(), 1);
        assert_eq!(
            literal[0].record,
            format!(r#"{{"triggering_system_event_id":"{}"}}"#, literal[0].new_id)
        );
    }

    #[test]
    fn unmatched_and_empty_identifiers_are_dropped() {
        let corpus = records(&[&format!(r#"{{"event_id":"{ID}"}}"#)]);
        let ids = records(&[ID, OTHER, ""]);
        let minter = IdMinter::new(ids.iter().map(String::as_str));
        let stats = RunStats::new();

        let out = resolve(&corpus, &ids, Mode::Literal, &minter, &stats)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(out.len(), 1);
        assert!(!out[0].record.contains(ID));
        assert_eq!(stats.resolved(), 1);
        assert_eq!(stats.unmatched(), 2);
    }

    #[test]
    fn duplicate_records_produce_one_result() {
        let line = format!(r#"{{"event_id":"{ID}"}}"#);
        let corpus = records(&[&line, &line, &line]);
        let ids = records(&[ID]);
        assert_eq!(run(&corpus, &ids, Mode::Structured).len(), 1);
    }

    #[test]
    fn minted_identifiers_are_fresh() {
        let reserved = [ID, OTHER];
        let minter = IdMinter::new(reserved);
        let minted: FxHashSet<String> = (0..10_000)
            .into_par_iter()
            .map(|_| minter.mint())
            .collect();

        assert_eq!(minted.len(), 10_000);
        assert_eq!(minter.issued(), 10_000);
        assert!(minted.iter().all(|id| is_canonical_uuid(id)));
        assert!(!minted.contains(ID));
        assert!(!minted.contains(OTHER));
    }
}
