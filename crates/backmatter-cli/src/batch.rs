//! Parallel enrichment of a directory of letters.

use crate::checkpoint::{CheckpointOutcome, Checkpointer};
use anyhow::{Context, Result};
use backmatter_pipeline::{Enricher, FileReport, FileStatus, StatsSnapshot};
use colored::Colorize;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// Progress lines are printed every this many completed files.
const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub dir: PathBuf,
    pub pattern: String,
    pub parallel: usize,
    pub limit: Option<usize>,
    /// `None` disables the per-document cutoff.
    pub document_timeout: Option<Duration>,
    pub checkpointer: Option<Checkpointer>,
    pub show_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Written,
    Unchanged,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl FileOutcome {
    fn from_result(path: &Path, result: backmatter_core::Result<FileReport>, elapsed: Duration) -> Self {
        let (outcome, error) = match result {
            Ok(report) => match report.status {
                FileStatus::Written => (Outcome::Written, None),
                FileStatus::Unchanged => (Outcome::Unchanged, None),
                FileStatus::Cancelled => (Outcome::TimedOut, Some("cancelled".to_string())),
            },
            Err(e) => (Outcome::Failed, Some(e.to_string())),
        };
        Self {
            path: path.to_path_buf(),
            outcome,
            error,
            duration_secs: elapsed.as_secs_f64(),
        }
    }

    fn timed_out(path: &Path, limit: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            outcome: Outcome::TimedOut,
            error: Some(format!("timed out after {}s", limit.as_secs())),
            duration_secs: limit.as_secs_f64(),
        }
    }

    const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Written | Outcome::Unchanged)
    }
}

/// Totals printed (or emitted as JSON) at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub duration_secs: f64,
    pub average_secs: f64,
    pub workers: usize,
    pub checkpoints: usize,
    pub resolver: StatsSnapshot,
    pub failures: Vec<FileOutcome>,
}

impl BatchSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome.outcome {
            Outcome::Written => self.succeeded += 1,
            Outcome::Unchanged => {
                self.succeeded += 1;
                self.unchanged += 1;
            }
            Outcome::TimedOut => {
                self.failed += 1;
                self.timed_out += 1;
                self.failures.push(outcome.clone());
            }
            Outcome::Failed => {
                self.failed += 1;
                self.failures.push(outcome.clone());
            }
        }
    }

    const fn done(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn print(&self) {
        eprintln!();
        eprintln!("{}", "=== Batch Enrichment Summary ===".bold());
        eprintln!("{:<16} {}", "Total files:", self.total);
        eprintln!(
            "{:<16} {}",
            "Succeeded:",
            self.succeeded.to_string().green()
        );
        if self.failed > 0 {
            eprintln!("{:<16} {}", "Failed:", self.failed.to_string().red());
        } else {
            eprintln!("{:<16} {}", "Failed:", self.failed);
        }
        if self.timed_out > 0 {
            eprintln!("{:<16} {}", "Timed out:", self.timed_out);
        }
        eprintln!("{:<16} {}", "Unchanged:", self.unchanged);
        eprintln!("{:<16} {:.2}s", "Total time:", self.duration_secs);
        eprintln!("{:<16} {:.2}s/file", "Average time:", self.average_secs);
        eprintln!("{:<16} {}", "Workers:", self.workers);
        if self.checkpoints > 0 {
            eprintln!("{:<16} {}", "Checkpoints:", self.checkpoints);
        }
        eprintln!();
        eprintln!("{}", "=== PMB Processing Statistics ===".bold());
        eprintln!("{}", self.resolver);
    }
}

/// Files matching `dir/pattern`, sorted, truncated to `limit`.
pub fn discover_files(dir: &Path, pattern: &str, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let full = dir.join(pattern);
    let full = full.to_string_lossy();
    let mut files: Vec<PathBuf> = glob(&full)
        .with_context(|| format!("Invalid glob pattern: {full}"))?
        .filter_map(|entry| match entry {
            Ok(path) => path.is_file().then_some(path),
            Err(e) => {
                log::warn!("Skipping unreadable path: {e}");
                None
            }
        })
        .collect();
    files.sort();
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    Ok(files)
}

/// Prints above the progress bar, or straight to stderr when it is hidden.
struct Reporter {
    progress: ProgressBar,
    show_output: bool,
}

impl Reporter {
    fn new(total: usize, show_output: bool) -> Self {
        let progress = if show_output {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░  "),
            );
            pb
        } else {
            ProgressBar::hidden()
        };
        Self {
            progress,
            show_output,
        }
    }

    fn line(&self, message: String) {
        if !self.show_output {
            return;
        }
        if self.progress.is_hidden() {
            eprintln!("{message}");
        } else {
            self.progress.println(message);
        }
    }
}

fn progress_line(summary: &BatchSummary, elapsed: Duration) -> String {
    let done = summary.done();
    let secs = elapsed.as_secs_f64();
    let avg = if done > 0 { secs / done as f64 } else { 0.0 };
    let eta = avg * summary.total.saturating_sub(done) as f64;
    let percent = if summary.total > 0 {
        100.0 * done as f64 / summary.total as f64
    } else {
        100.0
    };
    format!(
        "Progress: {done}/{} ({percent:.1}%) - {} {} {} {} - avg {avg:.2}s/file - ETA {}",
        summary.total,
        "✓".green(),
        summary.succeeded,
        "✗".red(),
        summary.failed,
        format_eta(eta),
    )
}

fn format_eta(secs: f64) -> String {
    let secs = secs.round() as u64;
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

/// Enrich one file, optionally under a wall-clock limit.
///
/// With a limit the work runs on a helper thread; on expiry the cancel
/// flag is raised so the helper never writes its result.
fn enrich_one(enricher: &Enricher, path: &Path, limit: Option<Duration>) -> FileOutcome {
    let started = Instant::now();
    let Some(limit) = limit else {
        let result = enricher.process_file(path, None, None);
        return FileOutcome::from_result(path, result, started.elapsed());
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let worker = {
        let enricher = enricher.clone();
        let path = path.to_path_buf();
        let cancel = Arc::clone(&cancel);
        std::thread::Builder::new()
            .name("backmatter-document".to_string())
            .spawn(move || {
                let result = enricher.process_file(&path, None, Some(&cancel));
                let _ = tx.send(result);
            })
    };
    if let Err(e) = worker {
        return FileOutcome {
            path: path.to_path_buf(),
            outcome: Outcome::Failed,
            error: Some(format!("failed to spawn worker: {e}")),
            duration_secs: started.elapsed().as_secs_f64(),
        };
    }

    match rx.recv_timeout(limit) {
        Ok(result) => FileOutcome::from_result(path, result, started.elapsed()),
        Err(_) => {
            cancel.store(true, Ordering::SeqCst);
            log::warn!("{} exceeded {}s, abandoning", path.display(), limit.as_secs());
            FileOutcome::timed_out(path, limit)
        }
    }
}

/// Run the batch and return its summary. Per-file failures do not stop it.
pub fn run_batch(enricher: &Enricher, options: &BatchOptions) -> Result<BatchSummary> {
    let files = discover_files(&options.dir, &options.pattern, options.limit)?;
    let workers = options.parallel.max(1);
    let mut summary = BatchSummary {
        total: files.len(),
        workers,
        ..BatchSummary::default()
    };
    if files.is_empty() {
        return Ok(summary);
    }

    if options.show_output {
        eprintln!(
            "Enriching {} files from {} with {} workers",
            files.len(),
            options.dir.display(),
            workers
        );
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("backmatter-worker-{i}"))
        .build()
        .context("Failed to build worker pool")?;
    let reporter = Reporter::new(files.len(), options.show_output);
    let started = Instant::now();
    let (tx, rx) = mpsc::channel::<FileOutcome>();

    std::thread::scope(|scope| {
        let files = &files;
        let pool = &pool;
        scope.spawn(move || {
            pool.install(|| {
                files.par_iter().for_each_with(tx, |tx, path| {
                    let outcome = enrich_one(enricher, path, options.document_timeout);
                    let _ = tx.send(outcome);
                });
            });
        });

        for outcome in rx {
            summary.record(&outcome);
            reporter.progress.inc(1);
            reporter.progress.set_message(format!(
                "{} {} {} {}",
                "✓".green(),
                summary.succeeded,
                "✗".red(),
                summary.failed
            ));

            if !outcome.is_success() {
                reporter.line(format!(
                    "{} {}: {}",
                    "✗".red(),
                    outcome.path.display(),
                    outcome.error.as_deref().unwrap_or("failed")
                ));
            } else {
                match maybe_checkpoint(options, &summary, &reporter) {
                    Ok(None | Some(CheckpointOutcome::Clean)) => {}
                    Ok(Some(_)) => summary.checkpoints += 1,
                    Err(e) => reporter.line(format!(
                        "{} Checkpoint failed: {e:#}",
                        "Warning:".yellow().bold()
                    )),
                }
            }

            let done = summary.done();
            if done % PROGRESS_EVERY == 0 || done == summary.total {
                reporter.line(progress_line(&summary, started.elapsed()));
            }
        }
    });

    reporter.progress.finish_and_clear();
    summary.duration_secs = started.elapsed().as_secs_f64();
    summary.average_secs = summary.duration_secs / summary.total as f64;
    summary.resolver = enricher.resolver().stats();
    Ok(summary)
}

fn maybe_checkpoint(
    options: &BatchOptions,
    summary: &BatchSummary,
    reporter: &Reporter,
) -> Result<Option<CheckpointOutcome>> {
    let Some(checkpointer) = options.checkpointer.as_ref() else {
        return Ok(None);
    };
    let Some(batch) = checkpointer.due(summary.succeeded) else {
        return Ok(None);
    };
    reporter.line(format!(
        "Intermediate commit: processed {}/{} files (batch {batch})",
        summary.succeeded, summary.total
    ));
    checkpointer
        .run(summary.succeeded, summary.total, batch)
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backmatter_pipeline::{LocalIndex, Resolver};
    use std::fs;

    const LETTER: &str = r##"<TEI><text><body><p><persName ref="#pmb2121">A.</persName></p></body></text></TEI>"##;

    fn offline_enricher() -> Enricher {
        Enricher::new(Arc::new(Resolver::new(LocalIndex::default(), 10, None)))
    }

    fn options(dir: &Path) -> BatchOptions {
        BatchOptions {
            dir: dir.to_path_buf(),
            pattern: "L*.xml".to_string(),
            parallel: 2,
            limit: None,
            document_timeout: None,
            checkpointer: None,
            show_output: false,
        }
    }

    #[test]
    fn test_discover_files_sorted_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["L00003.xml", "L00001.xml", "L00002.xml", "other.xml"] {
            fs::write(dir.path().join(name), LETTER).unwrap();
        }
        let files = discover_files(dir.path(), "L*.xml", Some(2)).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["L00001.xml", "L00002.xml"]);
    }

    #[test]
    fn test_batch_continues_past_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("L00001.xml"), LETTER).unwrap();
        fs::write(dir.path().join("L00002.xml"), "<TEI><text>").unwrap();
        fs::write(dir.path().join("L00003.xml"), "<TEI><teiHeader/></TEI>").unwrap();

        let summary = run_batch(&offline_enricher(), &options(dir.path())).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].path, dir.path().join("L00002.xml"));

        let enriched = fs::read_to_string(dir.path().join("L00001.xml")).unwrap();
        assert!(enriched.contains("<surname>Schnitzler</surname>"));
        assert_eq!(
            fs::read_to_string(dir.path().join("L00002.xml")).unwrap(),
            "<TEI><text>"
        );
    }

    #[test]
    fn test_document_timeout_still_finishes_fast_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("L00001.xml"), LETTER).unwrap();
        let mut opts = options(dir.path());
        opts.document_timeout = Some(Duration::from_secs(60));
        let summary = run_batch(&offline_enricher(), &opts).unwrap();
        assert_eq!((summary.succeeded, summary.failed), (1, 0));
    }

    #[test]
    fn test_empty_directory_yields_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run_batch(&offline_enricher(), &options(dir.path())).unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(42.4), "42s");
        assert_eq!(format_eta(125.0), "2m05s");
        assert_eq!(format_eta(3_720.0), "1h02m");
    }

    #[test]
    fn test_progress_line_reports_counts() {
        colored::control::set_override(false);
        let summary = BatchSummary {
            total: 40,
            succeeded: 9,
            failed: 1,
            ..BatchSummary::default()
        };
        let line = progress_line(&summary, Duration::from_secs(20));
        assert!(line.starts_with("Progress: 10/40 (25.0%)"));
        assert!(line.contains("avg 2.00s/file"));
        assert!(line.ends_with("ETA 1m00s"));
    }
}
