use crate::domain::model::Collection;
use crate::utils::error::{ReconcileError, Result};
use crate::utils::validation::validate_existing_dir;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_EXTENSION: &str = "pdf";

/// 遞迴列出資料夾中所有 PDF，依檔名排序走訪
///
/// 不跟隨符號連結，連結指向的檔案或資料夾都不會列入。
/// 資料夾不存在、不是資料夾或沒有任何 PDF 時直接失敗，不會開始擷取。
pub fn discover_documents(dir: &Path, collection: Collection) -> Result<Vec<PathBuf>> {
    validate_existing_dir(collection.label(), dir)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_document(entry.path()) {
            documents.push(entry.into_path());
        }
    }

    if documents.is_empty() {
        return Err(ReconcileError::input(format!(
            "La carpeta de {} no contiene archivos PDF: {}",
            collection.label(),
            dir.display()
        )));
    }

    tracing::debug!(
        "Found {} {} documents under {}",
        documents.len(),
        collection.label(),
        dir.display()
    );
    Ok(documents)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
        .unwrap_or(false)
}
