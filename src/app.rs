//! One document, end to end: read, summarize, assemble, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use precis_chunker::Document;
use precis_completion::{CompletionService, Gateway, OfflineService};
use precis_pipeline::{Summarizer, assemble};

use crate::config::AppConfig;
use crate::error::Result;
use crate::ingest::read_document;
use crate::store::SummaryStore;

/// What processing one document produced.
#[derive(Debug, Clone)]
pub struct Processed {
    pub document_name: String,
    pub summary: String,
    pub record_path: PathBuf,
    pub chunks: usize,
    pub degraded: bool,
    pub schema_violations: usize,
}

/// Selects the completion service for `config`: the offline extractor in
/// mock mode, the HTTP gateway otherwise.
///
/// # Errors
///
/// Returns an error if the gateway cannot be built.
pub fn build_service(config: &AppConfig) -> Result<Arc<dyn CompletionService>> {
    if config.pipeline.mock {
        info!("Mock mode enabled, using offline completion service");
        return Ok(Arc::new(OfflineService::default()));
    }
    Ok(Arc::new(Gateway::with_config(config.gateway.clone())?))
}

/// Shared, cloneable document processor.
#[derive(Debug, Clone)]
pub struct App {
    summarizer: Summarizer,
    store: SummaryStore,
}

impl App {
    /// Wire a processor around an existing service.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunker or pipeline configuration is invalid.
    pub fn new(service: Arc<dyn CompletionService>, config: &AppConfig) -> Result<Self> {
        let summarizer = Summarizer::new(service, config.chunker.clone(), config.pipeline.clone())?;
        Ok(Self {
            summarizer,
            store: SummaryStore::new(&config.summary_dir),
        })
    }

    /// Build the service from `config` and wire a processor around it.
    ///
    /// # Errors
    ///
    /// See [`build_service`] and [`App::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(build_service(config)?, config)
    }

    pub fn store(&self) -> &SummaryStore {
        &self.store
    }

    /// Read `path` and process it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, holds no text, or the
    /// record cannot be written.
    pub async fn process_path(&self, path: &Path) -> Result<Processed> {
        let document = read_document(path).await?;
        self.process_document(&document).await
    }

    /// Summarize `document` and persist its record.
    ///
    /// # Errors
    ///
    /// Returns an error if the document holds no text or the record cannot
    /// be written. Completion failures only degrade the summary.
    pub async fn process_document(&self, document: &Document) -> Result<Processed> {
        let report = self.summarizer.run(document).await?;
        let assembly = assemble(&document.name, &report, Utc::now());

        if !assembly.violations.is_empty() {
            warn!(
                file_name = %document.name,
                violations = assembly.violations.len(),
                "Structured summary saved despite schema violations"
            );
        }

        let record_path = self.store.save(&assembly.record).await?;

        Ok(Processed {
            document_name: document.name.clone(),
            summary: assembly.record.summary.summary,
            record_path,
            chunks: report.chunk_count(),
            degraded: report.is_degraded(),
            schema_violations: assembly.violations.len(),
        })
    }
}
