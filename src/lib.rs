//! Rekey: fresh identifiers for failed event records before republishing
//!
//! Given a folder of identifiers and a folder of event records (one per line),
//! rekey finds, for each identifier, one record carrying it, mints a new random
//! UUID, rewrites the record to carry the new value, and writes the rewritten
//! records and the new identifiers as two row-aligned files.
//!
//! # Pipeline
//!
//! 1. **Load** -- Walk `ids/` and `old/`, reading every file in parallel into memory
//! 2. **Resolve** -- For every identifier, search all records in parallel and rewrite
//!    the first one found
//! 3. **Write** -- Stream each (new id, rewritten record) row into `new/` as soon as
//!    it is produced
//!
//! # Modes
//!
//! - **Literal** -- a record matches when it contains the identifier anywhere; every
//!   occurrence is replaced
//! - **Structured** -- a record matches only through an `"event_id":"<uuid>"` field, so
//!   values copied into other fields (e.g. `triggering_system_event_id`) never select
//!   a record
//!
//! # Key Modules
//!
//! - [`loader`] -- Parallel recursive line loading
//! - [`engine`] -- Candidate search, identifier minting, record rewriting
//! - [`sink`] -- Row-aligned output writing with overwrite protection
//! - [`pipeline`] -- Working-directory layout and the end-to-end run
//! - [`audit`] -- Post-run verification of the output files
//! - [`stats`] -- Atomic run counters
//! - [`error`] -- Error categories that abort a run
//!
//! # Example Usage
//!
//! ```bash
//! # Replace ids wherever they appear
//! rekey run -w /data/incident-42
//!
//! # Only rewrite "event_id" fields
//! rekey run -w /data/incident-42 --mode structured
//!
//! # Check the output
//! rekey audit -w /data/incident-42
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod stats;
