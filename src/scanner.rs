use crate::candidates::CandidateStore;
use crate::error::Result;
use async_trait::async_trait;
use ironframe_scanner::{ChangedContent, ScanError, ScanMode};
use std::path::PathBuf;
use std::sync::Arc;

/// Extracts candidate tokens from source units.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan_many(
        &self,
        units: Vec<ChangedContent>,
        mode: ScanMode,
    ) -> std::result::Result<Vec<String>, ScanError>;
}

/// Scanner backed by the `ironframe-scanner` class extractors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassScanner;

#[async_trait]
impl Scanner for ClassScanner {
    async fn scan_many(
        &self,
        units: Vec<ChangedContent>,
        mode: ScanMode,
    ) -> std::result::Result<Vec<String>, ScanError> {
        ironframe_scanner::scan_many(&units, mode)
    }
}

/// Feeds scanned candidates into the shared store.
pub struct SourceScanner {
    scanner: Arc<dyn Scanner>,
    candidates: Arc<CandidateStore>,
}

impl SourceScanner {
    pub fn new(scanner: Arc<dyn Scanner>, candidates: Arc<CandidateStore>) -> Self {
        Self {
            scanner,
            candidates,
        }
    }

    /// Scans one unit of inline content. `kind_hint` is the extension the
    /// scanner uses to pick an extractor.
    ///
    /// Returns whether the store gained a candidate.
    pub async fn scan(&self, content: &str, kind_hint: &str) -> Result<bool> {
        self.scan_units(vec![ChangedContent::content(content, kind_hint)])
            .await
    }

    pub async fn scan_files(&self, paths: Vec<PathBuf>) -> Result<bool> {
        if paths.is_empty() {
            return Ok(false);
        }
        self.scan_units(paths.into_iter().map(ChangedContent::file).collect())
            .await
    }

    async fn scan_units(&self, units: Vec<ChangedContent>) -> Result<bool> {
        let found = self.scanner.scan_many(units, ScanMode::SEQUENTIAL).await?;
        if found.is_empty() {
            return Ok(false);
        }
        let count = found.len();
        let changed = self.candidates.insert(found);
        tracing::debug!(candidates = count, changed, "scanned source");
        Ok(changed)
    }
}
