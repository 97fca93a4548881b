use crate::adapters::render::{bundle_zip, renderer_for};
use crate::config::TomlConfig;
use crate::core::cancel::CancelToken;
use crate::core::discovery::discover_documents;
use crate::core::report::build_report;
use crate::domain::model::{Collection, CollectionExtraction, ExtractedRecord, Extraction, RecordIndex};
use crate::domain::ports::{FieldExtractor, Pipeline, Storage, TextSource};
use crate::domain::report::Report;
use crate::utils::error::{ReconcileError, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// 掃描兩個資料夾、擷取欄位、比對並輸出報表的管線
pub struct ReconcilePipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
    text_source: Arc<dyn TextSource>,
    extractor: Arc<dyn FieldExtractor>,
    report_stem: Option<String>,
}

impl<S: Storage> ReconcilePipeline<S> {
    pub fn new(
        storage: S,
        config: TomlConfig,
        text_source: Arc<dyn TextSource>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        Self {
            storage,
            config,
            text_source,
            extractor,
            report_stem: None,
        }
    }

    /// 固定輸出檔名 (不含副檔名)，取代依時間產生的名稱
    pub fn with_report_stem(mut self, stem: impl Into<String>) -> Self {
        self.report_stem = Some(stem.into());
        self
    }

    fn report_stem(&self) -> Result<String> {
        if let Some(stem) = &self.report_stem {
            return Ok(stem.clone());
        }

        let pattern = &self.config.report.file_stem;
        let mut stem = String::new();
        write!(stem, "{}", chrono::Local::now().format(pattern)).map_err(|_| {
            ReconcileError::InvalidConfigValueError {
                field: "report.file_stem".to_string(),
                value: pattern.clone(),
                reason: "Unknown date format specifier".to_string(),
            }
        })?;
        Ok(stem)
    }

    fn validate_output_dir(&self) -> Result<()> {
        let output_dir = &self.config.report.output_dir;
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(ReconcileError::input(format!(
                "La ruta de destino del reporte no es una carpeta: {}",
                output_dir.display()
            )));
        }
        Ok(())
    }

    async fn extract_collection(
        &self,
        collection: Collection,
        documents: Vec<PathBuf>,
        cancel: &CancelToken,
    ) -> Result<Option<CollectionExtraction>> {
        let total = documents.len();
        tracing::info!("📂 Extracting {} {} documents", total, collection.label());

        let semaphore = Arc::new(Semaphore::new(self.config.performance.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (position, path) in documents.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let text_source = Arc::clone(&self.text_source);
            let extractor = Arc::clone(&self.extractor);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                // 開始下一份文件前檢查取消
                if cancel.is_cancelled() {
                    return None;
                }
                tracing::info!(
                    "📄 [{}/{}] {}: {}",
                    position + 1,
                    total,
                    collection.label(),
                    path.display()
                );
                let outcome = extract_document(text_source.as_ref(), extractor.as_ref(), &path).await;
                Some((position, path, outcome))
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            if let Some(result) = joined? {
                results.push(result);
            }
        }

        if cancel.is_cancelled() {
            tracing::warn!(
                "🛑 {} extraction cancelled after {} of {} documents",
                collection.label(),
                results.len(),
                total
            );
            return Ok(None);
        }

        // 依文件順序寫入，確保報表列順序可重現
        results.sort_by_key(|(position, _, _)| *position);

        let mut index = RecordIndex::new();
        let mut failures = 0;
        let mut collisions = Vec::new();

        for (_, path, outcome) in results {
            let record = match outcome {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("⚠️ Extraction failed for {}: {}", path.display(), e);
                    failures += 1;
                    ExtractedRecord::default()
                }
            };

            let key = record.key();
            if index.insert(key.clone(), record).is_some() {
                tracing::warn!(
                    "⚠️ Duplicate key {} in {}: {} replaces the earlier document",
                    key,
                    collection.label(),
                    path.display()
                );
                collisions.push(key);
            }
        }

        tracing::info!(
            "✅ {}: {} documents, {} keys, {} failures",
            collection.label(),
            total,
            index.len(),
            failures
        );

        Ok(Some(CollectionExtraction {
            collection,
            index,
            documents: total,
            failures,
            collisions,
        }))
    }
}

async fn extract_document(
    text_source: &dyn TextSource,
    extractor: &dyn FieldExtractor,
    path: &Path,
) -> Result<ExtractedRecord> {
    let text = text_source.load_text(path).await?;
    extractor.extract_fields(&text).await
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ReconcilePipeline<S> {
    async fn extract(&self, cancel: &CancelToken) -> Result<Option<Extraction>> {
        // 任何擷取開始前先檢查所有輸入
        let promise_documents = discover_documents(self.config.promises_dir()?, Collection::Promises)?;
        let certificate_documents =
            discover_documents(self.config.certificates_dir()?, Collection::Certificates)?;
        self.validate_output_dir()?;

        let Some(promises) = self
            .extract_collection(Collection::Promises, promise_documents, cancel)
            .await?
        else {
            return Ok(None);
        };

        let Some(certificates) = self
            .extract_collection(Collection::Certificates, certificate_documents, cancel)
            .await?
        else {
            return Ok(None);
        };

        Ok(Some(Extraction {
            promises,
            certificates,
        }))
    }

    async fn transform(&self, extraction: &Extraction) -> Result<Report> {
        tracing::info!(
            "🔧 Matching {} promises against {} certificates",
            extraction.promises.index.len(),
            extraction.certificates.index.len()
        );

        let report = build_report(&extraction.promises.index, &extraction.certificates.index);
        let summary = report.summary();
        tracing::info!(
            "✅ {} rows: {} ok, {} mismatched, {} missing certificate",
            summary.rows,
            summary.ok,
            summary.mismatched,
            summary.missing
        );
        Ok(report)
    }

    async fn load(&self, report: &Report) -> Result<Vec<String>> {
        let stem = self.report_stem()?;
        let mut files = Vec::with_capacity(self.config.report.formats.len());

        for format in &self.config.report.formats {
            let renderer = renderer_for(format)?;
            let data = renderer.render(report)?;
            let name = format!("{}.{}", stem, renderer.extension());
            tracing::debug!("Rendered {} ({} bytes)", name, data.len());
            files.push((name, data));
        }

        if self.config.report.compression.enabled {
            let name = self
                .config
                .report
                .compression
                .filename
                .clone()
                .unwrap_or_else(|| format!("{}.zip", stem));
            files = vec![(name, bundle_zip(&files)?)];
        }

        let mut written = Vec::with_capacity(files.len());
        for (name, data) in files {
            self.storage
                .write_file(&name, &data)
                .await
                .map_err(|e| ReconcileError::render(format!("cannot write {}: {}", name, e)))?;
            let location = self.storage.locate(&name);
            tracing::info!("💾 Report saved: {}", location);
            written.push(location);
        }

        Ok(written)
    }
}
