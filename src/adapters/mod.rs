// Adapters layer: concrete implementations of the domain ports (OCR tools, LLM API, renderers, storage).

pub mod llm;
pub mod ocr;
pub mod render;
pub mod storage;

pub use llm::OpenAiFieldExtractor;
pub use ocr::OcrMyPdfTextSource;
pub use storage::LocalStorage;
