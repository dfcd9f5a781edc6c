//! Intermediate git commits during long batch runs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// What a checkpoint did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOutcome {
    /// Working tree had no changes.
    Clean,
    Committed,
    Pushed,
    /// Push failed once, succeeded after `pull --rebase`.
    PushedAfterRebase,
}

/// Commits progress every `interval` successful documents.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    repo_dir: PathBuf,
    interval: usize,
    push: bool,
}

impl Checkpointer {
    pub fn new(repo_dir: impl Into<PathBuf>, interval: usize, push: bool) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            interval,
            push,
        }
    }

    /// Batch number for `succeeded`, if a checkpoint is due.
    pub fn due(&self, succeeded: usize) -> Option<usize> {
        if self.interval > 0 && succeeded > 0 && succeeded % self.interval == 0 {
            Some(succeeded / self.interval)
        } else {
            None
        }
    }

    /// Commit (and optionally push) whatever the batch has written so far.
    pub fn run(&self, succeeded: usize, total: usize, batch: usize) -> Result<CheckpointOutcome> {
        let status = git(&self.repo_dir, &["status", "--porcelain"])?;
        if status.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(CheckpointOutcome::Clean);
        }

        git(&self.repo_dir, &["add", "-A"])?;
        git(
            &self.repo_dir,
            &["commit", "-m", &commit_message(succeeded, total, batch)],
        )?;
        if !self.push {
            return Ok(CheckpointOutcome::Committed);
        }

        match git(&self.repo_dir, &["push"]) {
            Ok(_) => Ok(CheckpointOutcome::Pushed),
            Err(e) => {
                log::warn!("push failed, rebasing: {e:#}");
                git(&self.repo_dir, &["pull", "--rebase"])?;
                git(&self.repo_dir, &["push"])?;
                Ok(CheckpointOutcome::PushedAfterRebase)
            }
        }
    }
}

pub fn commit_message(succeeded: usize, total: usize, batch: usize) -> String {
    format!(
        "Intermediate commit: processed {succeeded}/{total} files (batch {batch})\n\n\
         Automated batch processing checkpoint"
    )
}

fn git(dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("Failed to run git {}", args.join(" ")))?;
    if !output.status.success() {
        anyhow::bail!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output)
}
