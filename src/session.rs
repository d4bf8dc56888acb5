//! Patch session lifecycle.
//!
//! A session is created uninitialized, loads its patch sets exactly once in
//! [`PatchSession::init`], rewrites method bodies while ready, and is closed
//! with [`PatchSession::teardown`]. Calls made in the wrong state fail instead
//! of being silently ignored.

use crate::config::{apply_patches, load_from_path, ConfigError, PatchConfig, PatchReport, PatchResult};
use crate::ir::InstructionStream;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    TornDown,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot {operation}: session is {actual:?}, expected {expected:?}")]
    InvalidState {
        operation: &'static str,
        expected: SessionState,
        actual: SessionState,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Counters accumulated over a session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub streams: usize,
    pub applied: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct PatchSession {
    host_version: String,
    state: SessionState,
    sets: Vec<PatchConfig>,
    stats: SessionStats,
}

impl PatchSession {
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
            state: SessionState::Uninitialized,
            sets: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                expected,
                actual: self.state,
            })
        }
    }

    /// Register patch sets and move to `Ready`.
    pub fn init<I>(&mut self, sets: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = PatchConfig>,
    {
        self.expect_state("init", SessionState::Uninitialized)?;
        self.sets = sets.into_iter().collect();
        self.state = SessionState::Ready;

        let patch_count: usize = self.sets.iter().map(|s| s.patches.len()).sum();
        info!(
            "Patch session ready: {} patch set(s), {} patch(es), host version {}",
            self.sets.len(),
            patch_count,
            self.host_version
        );
        Ok(())
    }

    /// Load every path as a patch set, then [`init`](Self::init).
    ///
    /// Nothing is registered if any file fails to load.
    pub fn init_from_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), SessionError> {
        self.expect_state("init", SessionState::Uninitialized)?;
        let sets = paths
            .iter()
            .map(load_from_path)
            .collect::<Result<Vec<_>, _>>()?;
        self.init(sets)
    }

    /// Methods that at least one registered patch targets.
    pub fn methods(&self) -> BTreeSet<&str> {
        self.sets
            .iter()
            .flat_map(|set| set.patches.iter().map(|p| p.method.as_str()))
            .collect()
    }

    /// Rewrite `stream`, the body of `method`, with every registered set.
    ///
    /// The report lists only definitions that target `method`.
    pub fn transpile(
        &mut self,
        method: &str,
        stream: &mut InstructionStream,
    ) -> Result<PatchReport, SessionError> {
        self.expect_state("transpile", SessionState::Ready)?;
        self.stats.streams += 1;

        let mut report = PatchReport::new();
        for set in &self.sets {
            if set.patches_for(method).next().is_none() {
                continue;
            }
            let results = apply_patches(set, method, stream, &self.host_version);
            for (id, result) in results {
                match &result {
                    Ok(PatchResult::SkippedMethod { .. }) => continue,
                    Ok(PatchResult::Applied { .. }) => self.stats.applied += 1,
                    Ok(PatchResult::NotFound { .. }) => self.stats.not_found += 1,
                    Ok(PatchResult::SkippedVersion { .. }) => self.stats.skipped += 1,
                    Err(_) => self.stats.failed += 1,
                }
                report.push((id, result));
            }
        }

        debug!("Transpiled {} with {} applicable patch(es)", method, report.len());
        Ok(report)
    }

    /// Release registered sets and return the run statistics.
    pub fn teardown(&mut self) -> Result<SessionStats, SessionError> {
        self.expect_state("teardown", SessionState::Ready)?;
        self.sets.clear();
        self.state = SessionState::TornDown;

        let stats = std::mem::take(&mut self.stats);
        info!(
            "Patch session closed: {} stream(s), {} applied, {} not found, {} failed",
            stats.streams, stats.applied, stats.not_found, stats.failed
        );
        Ok(stats)
    }
}
