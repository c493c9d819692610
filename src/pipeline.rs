use crate::config::{
    IDS_DIR_NAME, NEW_DIR_NAME, NEW_EVENTS_FILE_NAME, NEW_IDS_FILE_NAME, OLD_DIR_NAME,
    PROGRESS_BAR_WIDTH,
};
use crate::engine::{self, IdMinter};
use crate::error::Result;
use crate::loader::load_lines;
use crate::models::Mode;
use crate::sink::{prepare_output_dir, ResultSink};
use crate::stats::RunStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Folder layout of a run: `ids/` and `old/` in, `new/` out.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ids_dir(&self) -> PathBuf {
        self.root.join(IDS_DIR_NAME)
    }

    pub fn old_dir(&self) -> PathBuf {
        self.root.join(OLD_DIR_NAME)
    }

    pub fn new_dir(&self) -> PathBuf {
        self.root.join(NEW_DIR_NAME)
    }

    pub fn new_ids_file(&self) -> PathBuf {
        self.new_dir().join(NEW_IDS_FILE_NAME)
    }

    pub fn new_events_file(&self) -> PathBuf {
        self.new_dir().join(NEW_EVENTS_FILE_NAME)
    }
}

pub struct RunConfig {
    pub workdir: WorkDir,
    pub mode: Mode,
    /// Remove `new/` before starting
    pub clean: bool,
    pub show_progress: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub identifiers: usize,
    pub resolved: u64,
    pub unmatched: u64,
    pub written: u64,
    pub load_duration: Duration,
    pub resolve_duration: Duration,
}

fn progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let template = format!(
        "[{{bar:{}}}] {{percent}}% [{{pos}}/{{len}}] {{elapsed_precise}}",
        PROGRESS_BAR_WIDTH
    );
    if let Ok(style) = ProgressStyle::with_template(&template) {
        pb.set_style(style.progress_chars("#>."));
    }
    pb
}

/// Loads both folders, resolves every identifier and streams the rewritten
/// rows into `new/`.
///
/// Output files are created before anything is loaded, so a run against a
/// directory holding earlier results fails without doing any work.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let workdir = &config.workdir;
    prepare_output_dir(&workdir.new_dir(), config.clean)?;
    let sink = ResultSink::create(workdir.new_ids_file(), workdir.new_events_file())?;

    let start_loading = Instant::now();
    let identifiers = load_lines(workdir.ids_dir())?;
    let records = load_lines(workdir.old_dir())?;
    let load_duration = start_loading.elapsed();

    info!(
        "processing [{} old, {} ids] in {} mode",
        records.len(),
        identifiers.len(),
        config.mode
    );

    let start_resolving = Instant::now();
    let stats = RunStats::new();
    let minter = IdMinter::new(identifiers.iter().map(String::as_str));
    let pb = progress_bar(identifiers.len() as u64, config.show_progress);

    let results = engine::resolve(&records, &identifiers, config.mode, &minter, &stats);
    let written = sink.write_all(results, &stats, |done| pb.set_position(done));
    pb.finish();
    written?;
    sink.finish()?;
    let resolve_duration = start_resolving.elapsed();

    info!(
        duration_secs = resolve_duration.as_secs_f64(),
        written = stats.written(),
        "Resolution complete"
    );

    Ok(RunSummary {
        records: records.len(),
        identifiers: identifiers.len(),
        resolved: stats.resolved(),
        unmatched: stats.unmatched(),
        written: stats.written(),
        load_duration,
        resolve_duration,
    })
}
