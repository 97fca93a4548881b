use conciliador::utils::error::{ErrorSeverity, ReconcileError};
use conciliador::utils::{logger, validation::Validate};
use conciliador::{
    CancelToken, CliConfig, LocalStorage, OcrMyPdfTextSource, OpenAiFieldExtractor,
    ReconcileEngine, ReconcilePipeline, RunOutcome,
};
use std::sync::Arc;

const EXIT_CANCELLED: i32 = 130;

fn exit_code(e: &ReconcileError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1, // 處理錯誤
        ErrorSeverity::Medium => 2,                    // 網路錯誤，可重試
        ErrorSeverity::Critical => 3,                  // 設定或系統錯誤
    }
}

fn fail(e: ReconcileError) -> ! {
    tracing::error!(
        "❌ Reconciliation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse_args();

    // 日誌層級可能來自設定檔，先合併設定
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose, None);
            fail(e);
        }
    };

    let level = config.monitoring.log_level.as_deref();
    if cli.log_json {
        logger::init_json_logger(cli.verbose, level);
    } else {
        logger::init_cli_logger(cli.verbose, level);
    }

    tracing::info!("Starting conciliador");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(e);
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let api_key = config.api_key().unwrap_or_default().to_string();
    let extractor = match OpenAiFieldExtractor::new(config.extractor.clone(), api_key) {
        Ok(extractor) => extractor,
        Err(e) => fail(e),
    };
    let text_source = OcrMyPdfTextSource::new(config.ocr.clone());
    let storage = LocalStorage::new(config.report.output_dir.clone());

    let cancel = CancelToken::new();
    let ctrl_c = cancel.cancel_on_ctrl_c();
    let deadline = config.deadline().map(|deadline| cancel.cancel_after(deadline));

    let pipeline = ReconcilePipeline::new(storage, config, Arc::new(text_source), Arc::new(extractor));
    let engine = ReconcileEngine::new_with_monitoring(pipeline, monitor_enabled);

    let result = engine.run(&cancel).await;

    ctrl_c.abort();
    if let Some(deadline) = deadline {
        deadline.abort();
    }

    match result {
        Ok(RunOutcome::Completed(summary)) => {
            tracing::info!("✅ Reconciliation completed successfully!");
            println!("✅ Conciliación completada");
            println!(
                "   Promesas: {} documentos | Certificados: {} documentos",
                summary.promise_documents, summary.certificate_documents
            );
            println!(
                "   Filas: {} | OK: {} | Con diferencias: {} | Sin certificado: {}",
                summary.report.rows,
                summary.report.ok,
                summary.report.mismatched,
                summary.report.missing
            );
            if summary.failures > 0 {
                println!("   ⚠️ Documentos sin datos extraídos: {}", summary.failures);
            }
            if summary.collisions > 0 {
                println!("   ⚠️ Claves duplicadas: {}", summary.collisions);
            }
            if summary.orphan_certificates > 0 {
                println!(
                    "   ⚠️ Certificados sin promesa: {}",
                    summary.orphan_certificates
                );
            }
            for output in &summary.outputs {
                println!("📁 {}", output);
            }
        }
        Ok(RunOutcome::Cancelled) => {
            eprintln!("🛑 Proceso cancelado, no se generó el reporte");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => fail(e),
    }
}
