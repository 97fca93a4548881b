use async_trait::async_trait;
use calamine::{open_workbook, Data, Reader, Xlsx};
use conciliador::adapters::render::xlsx::SHEET_NAME;
use conciliador::config::TomlConfig;
use conciliador::domain::ports::TextSource;
use conciliador::utils::error::{ErrorSeverity, ReconcileError};
use conciliador::{
    CancelToken, LocalStorage, OpenAiFieldExtractor, ReconcileEngine, ReconcilePipeline,
    RunOutcome, RunSummary,
};
use httpmock::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::assert_ok;

/// 以檔名代替 OCR 結果，例如 p1.pdf → "DOC-P1"
struct FileNameText;

#[async_trait]
impl TextSource for FileNameText {
    async fn load_text(&self, path: &Path) -> conciliador::Result<String> {
        let stem = path.file_stem().unwrap().to_string_lossy().to_uppercase();
        Ok(format!("DOC-{}", stem))
    }
}

struct Workspace {
    _root: TempDir,
    promises: PathBuf,
    certificates: PathBuf,
    output: PathBuf,
}

fn workspace(promises: &[&str], certificates: &[&str]) -> Workspace {
    let root = TempDir::new().unwrap();
    let promises_dir = root.path().join("promesas");
    let certificates_dir = root.path().join("certificados");
    fs::create_dir_all(promises_dir.join("torre_a")).unwrap();
    fs::create_dir_all(&certificates_dir).unwrap();

    for name in promises {
        fs::write(promises_dir.join(format!("{}.pdf", name)), b"%PDF-1.4").unwrap();
    }
    for name in certificates {
        fs::write(certificates_dir.join(format!("{}.PDF", name)), b"%PDF-1.4").unwrap();
    }
    // 不是 PDF 的檔案不會被處理
    fs::write(promises_dir.join("torre_a").join("notas.txt"), b"-").unwrap();

    Workspace {
        output: root.path().join("reportes"),
        promises: promises_dir,
        certificates: certificates_dir,
        _root: root,
    }
}

fn config(workspace: &Workspace, api_base: String) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.input.promises_dir = Some(workspace.promises.clone());
    config.input.certificates_dir = Some(workspace.certificates.clone());
    config.report.output_dir = workspace.output.clone();
    config.report.formats = vec!["xlsx".to_string(), "csv".to_string(), "json".to_string()];
    config.extractor.api_base = api_base;
    config.extractor.api_key = Some("sk-test".to_string());
    config.ocr.enabled = false;
    config.performance.concurrency = 2;
    config
}

fn engine(
    workspace: &Workspace,
    config: TomlConfig,
) -> ReconcileEngine<ReconcilePipeline<LocalStorage>> {
    let extractor = OpenAiFieldExtractor::new(config.extractor.clone(), "sk-test").unwrap();
    let pipeline = ReconcilePipeline::new(
        LocalStorage::new(workspace.output.clone()),
        config,
        Arc::new(FileNameText),
        Arc::new(extractor),
    )
    .with_report_stem("REPORTE_PRUEBA");
    ReconcileEngine::new(pipeline)
}

fn mock_document(server: &MockServer, token: &str, fields: serde_json::Value) {
    let content = fields.to_string();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains(format!("Text:\\n{}", token));
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            }));
    });
}

fn mock_standard_documents(server: &MockServer) {
    mock_document(
        server,
        "DOC-P1",
        serde_json::json!({
            "nombre": "Ana Diaz", "rut": "12.345.678-K", "departamento": "101",
            "monto_credito": 50000000, "fecha": "2024-01-10"
        }),
    );
    mock_document(
        server,
        "DOC-P2",
        serde_json::json!({
            "nombre": "Luis Soto", "rut": "9.876.543-2", "departamento": 202,
            "monto_credito": 30000000, "fecha": "2024-02-01"
        }),
    );
    // DOC-P3 的擷取失敗
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("Text:\\nDOC-P3");
        then.status(500).body("internal error");
    });
    mock_document(
        server,
        "DOC-C1",
        serde_json::json!({
            "nombre": "Ana Diaz", "rut": "12345678-k", "departamento": "101",
            "monto_credito": "$48.000.000", "fecha": "2024-01-10"
        }),
    );
    mock_document(
        server,
        "DOC-C9",
        serde_json::json!({
            "nombre": "Pedro Rojas", "rut": "11.111.111-1", "departamento": "909",
            "monto_credito": 1000, "fecha": "2023-12-01"
        }),
    );
}

fn completed(outcome: RunOutcome) -> RunSummary {
    match outcome {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::Cancelled => panic!("expected a completed run"),
    }
}

#[tokio::test]
async fn test_end_to_end_reconciliation() {
    let workspace = workspace(&["p1", "p2", "p3"], &["c1", "c9"]);
    let server = MockServer::start();
    mock_standard_documents(&server);

    let engine = engine(&workspace, config(&workspace, server.url("/v1")));
    let outcome = assert_ok!(engine.run(&CancelToken::new()).await);
    let summary = completed(outcome);

    assert_eq!(summary.outputs.len(), 3);
    assert_eq!(summary.promise_documents, 3);
    assert_eq!(summary.certificate_documents, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.collisions, 0);
    assert_eq!(summary.orphan_certificates, 1);
    assert_eq!(summary.report.rows, 3);
    assert_eq!(summary.report.ok, 0);
    assert_eq!(summary.report.mismatched, 1);
    assert_eq!(summary.report.missing, 2);

    let csv = fs::read_to_string(workspace.output.join("REPORTE_PRUEBA.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[1],
        "101,Ana Diaz,12345678k,Ana Diaz,12345678k,50000000,48000000,2024-01-10,2024-01-10,false,monto_credito"
    );
    assert_eq!(lines[2], "202,Luis Soto,98765432,,,,,,,true,");
    // 擷取失敗的文件以空白紀錄列出
    assert_eq!(lines[3], ",,,,,,,,,true,");

    let json: serde_json::Value =
        serde_json::from_slice(&fs::read(workspace.output.join("REPORTE_PRUEBA.json")).unwrap())
            .unwrap();
    assert_eq!(json["summary"]["missing"], 2);
    assert_eq!(json["rows"][0]["classification"], "MISMATCHED");
    assert_eq!(json["rows"][1]["classification"], "MISSING");

    let mut workbook: Xlsx<_> = open_workbook(workspace.output.join("REPORTE_PRUEBA.xlsx")).unwrap();
    let range = workbook.worksheet_range(SHEET_NAME).unwrap();
    assert_eq!(range.get_size(), (4, 11));
    assert_eq!(
        range.get_value((2, 1)),
        Some(&Data::String("Luis Soto".to_string()))
    );
    assert_eq!(range.get_value((2, 9)), Some(&Data::Bool(true)));
}

#[tokio::test]
async fn test_zip_bundle_with_custom_name() {
    let workspace = workspace(&["p1"], &["c1"]);
    let server = MockServer::start();
    mock_standard_documents(&server);

    let mut config = config(&workspace, server.url("/v1"));
    config.report.compression.enabled = true;
    config.report.compression.filename = Some("conciliacion.zip".to_string());

    let summary = completed(engine(&workspace, config).run(&CancelToken::new()).await.unwrap());

    assert_eq!(summary.outputs.len(), 1);
    assert!(summary.outputs[0].ends_with("conciliacion.zip"));
    assert!(!workspace.output.join("REPORTE_PRUEBA.csv").exists());

    let data = fs::read(workspace.output.join("conciliacion.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data)).unwrap();
    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["REPORTE_PRUEBA.csv", "REPORTE_PRUEBA.json", "REPORTE_PRUEBA.xlsx"]
    );
}

#[tokio::test]
async fn test_unreachable_model_degrades_every_document() {
    let workspace = workspace(&["p1", "p2"], &["c1"]);
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(503).body("unavailable");
    });

    let mut config = config(&workspace, server.url("/v1"));
    config.report.formats = vec!["csv".to_string()];

    let summary = completed(engine(&workspace, config).run(&CancelToken::new()).await.unwrap());

    api_mock.assert_hits(3);
    assert_eq!(summary.failures, 3);
    // 所有空白紀錄共用鍵 "_"
    assert_eq!(summary.collisions, 1);
    assert_eq!(summary.report.rows, 1);
    assert_eq!(summary.report.ok, 1);
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let workspace = workspace(&["p1", "p2"], &["c1"]);
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).body("{}");
    });

    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = engine(&workspace, config(&workspace, server.url("/v1")))
        .run(&cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled));
    api_mock.assert_hits(0);
    assert!(!workspace.output.exists());
}

#[tokio::test]
async fn test_missing_folder_is_input_error() {
    let workspace = workspace(&["p1"], &["c1"]);
    let mut config = config(&workspace, "http://127.0.0.1:9/v1".to_string());
    config.input.certificates_dir = Some(workspace.certificates.join("no_existe"));

    let err = engine(&workspace, config)
        .run(&CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::InputValidationError { .. }));
    assert_eq!(err.severity(), ErrorSeverity::High);
    assert!(!workspace.output.exists());
}

#[tokio::test]
async fn test_folder_without_pdfs_is_input_error() {
    let workspace = workspace(&[], &["c1"]);
    let config = config(&workspace, "http://127.0.0.1:9/v1".to_string());

    let err = engine(&workspace, config)
        .run(&CancelToken::new())
        .await
        .unwrap_err();

    assert!(err.user_friendly_message().contains("promesas"));
}
