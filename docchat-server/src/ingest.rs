//! Turning an uploaded file into a [`LoadedDocument`].
//!
//! The `Display` text of every [`IngestError`] is the message shown to the
//! user.

use std::io::Write;

use axum::body::Bytes;
use chrono::Utc;
use docchat_rag::{Document, RetrievalChain};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::API_KEY_VAR;
use crate::state::{LoadedDocument, Services};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No file was uploaded.")]
    MissingFile,

    #[error("Please upload a PDF file.")]
    NotPdf,

    #[error("The uploaded file is empty.")]
    EmptyFile,

    #[error(
        "No text could be extracted from the PDF. The file might be corrupted or password-protected."
    )]
    NoText,

    #[error(
        "Error reading PDF: {0}. Please ensure the PDF is not corrupted or password-protected."
    )]
    Unreadable(String),

    #[error("An error occurred: {0}")]
    Internal(String),
}

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Bytes,
}

pub fn is_pdf_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

/// Reject uploads that can be refused without reading them.
pub fn validate(upload: &Upload) -> Result<(), IngestError> {
    if !is_pdf_filename(&upload.filename) {
        return Err(IngestError::NotPdf);
    }
    if upload.content.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    Ok(())
}

/// Extract, chunk, embed and index an upload that passed [`validate`].
///
/// The file is staged on disk for the loader and removed before this
/// returns, whatever the outcome.
pub async fn ingest(services: &Services, upload: Upload) -> Result<LoadedDocument, IngestError> {
    let Upload { filename, content } = upload;
    let size = content.len();

    let loader = services.loader.clone();
    let source = filename.clone();
    let pages = tokio::task::spawn_blocking(move || {
        let mut staged = tempfile::Builder::new()
            .prefix("docchat-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| IngestError::Internal(format!("cannot stage upload: {e}")))?;
        staged
            .write_all(&content)
            .and_then(|()| staged.flush())
            .map_err(|e| IngestError::Internal(format!("cannot stage upload: {e}")))?;

        loader.load(staged.path(), &source).map_err(|e| IngestError::Unreadable(e.to_string()))
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            warn!(file = %filename, "pdf loader panicked");
            IngestError::Unreadable("the PDF parser failed on this file".to_string())
        } else {
            IngestError::Internal(e.to_string())
        }
    })??;

    if !pages.iter().any(Document::has_text) {
        return Err(IngestError::NoText);
    }

    let model = services.chat_model.clone().ok_or_else(|| {
        IngestError::Internal(format!("chat model is not configured (set {API_KEY_VAR})"))
    })?;
    let embedder = services.embedder.clone().ok_or_else(|| {
        IngestError::Internal(format!("embedding model is not configured (set {API_KEY_VAR})"))
    })?;

    let chain = RetrievalChain::from_documents(
        &pages,
        &filename,
        services.rag.clone(),
        embedder,
        model,
    )
    .await
    .map_err(|e| IngestError::Internal(e.to_string()))?;

    info!(
        file = %filename,
        bytes = size,
        pages = pages.len(),
        chunks = chain.chunk_count(),
        "document indexed"
    );

    Ok(LoadedDocument { name: filename, pages: pages.len(), chain, loaded_at: Utc::now() })
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use docchat_model::{ChatModel, MockChatModel};
    use docchat_rag::{
        DocumentLoader, MockEmbeddingProvider, RagConfig, RagError, pages_to_documents,
    };

    use super::*;

    /// Reads the staged file as UTF-8 and remembers where it was.
    #[derive(Default)]
    struct RecordingLoader {
        seen: Mutex<Option<PathBuf>>,
    }

    impl DocumentLoader for RecordingLoader {
        fn name(&self) -> &str {
            "recording"
        }

        fn load(&self, path: &Path, source: &str) -> docchat_rag::Result<Vec<Document>> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = Some(path.to_path_buf());
            }
            let text = std::fs::read_to_string(path).map_err(|e| RagError::LoaderError {
                loader: "recording".into(),
                message: e.to_string(),
            })?;
            Ok(pages_to_documents(text.split('\x0C'), source))
        }
    }

    struct PanickingLoader;

    impl DocumentLoader for PanickingLoader {
        fn name(&self) -> &str {
            "panicking"
        }

        fn load(&self, _path: &Path, _source: &str) -> docchat_rag::Result<Vec<Document>> {
            panic!("malformed xref table")
        }
    }

    fn services(loader: Arc<dyn DocumentLoader>, with_model: bool) -> Services {
        Services {
            loader,
            embedder: Some(Arc::new(MockEmbeddingProvider::default())),
            chat_model: with_model.then(|| Arc::new(MockChatModel::echo()) as Arc<dyn ChatModel>),
            rag: RagConfig::default(),
        }
    }

    fn upload(name: &str, content: &'static [u8]) -> Upload {
        Upload { filename: name.to_string(), content: Bytes::from_static(content) }
    }

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf_filename("report.pdf"));
        assert!(is_pdf_filename("REPORT.PDF"));
        assert!(is_pdf_filename(".pdf"));
        assert!(is_pdf_filename("scan .PDF"));
        assert!(!is_pdf_filename("report.pdf.txt"));
        assert!(!is_pdf_filename("reportpdf"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename(""));
    }

    #[test]
    fn validation_messages_match_the_client_contract() {
        assert_eq!(
            validate(&upload("notes.txt", b"hi")).unwrap_err().to_string(),
            "Please upload a PDF file."
        );
        assert_eq!(
            validate(&upload("empty.pdf", b"")).unwrap_err().to_string(),
            "The uploaded file is empty."
        );
    }

    #[tokio::test]
    async fn ingest_leaves_validation_to_the_caller() {
        let services = services(Arc::new(RecordingLoader::default()), true);
        let document = ingest(&services, upload("notes.txt", b"already checked")).await.unwrap();
        assert_eq!(document.name, "notes.txt");
    }

    #[tokio::test]
    async fn staged_file_is_removed_after_loading() {
        let loader = Arc::new(RecordingLoader::default());
        let services = services(loader.clone(), true);

        let document = ingest(&services, upload("a.pdf", b"hello world")).await.unwrap();
        assert_eq!(document.name, "a.pdf");
        assert_eq!(document.pages, 1);

        let staged = loader.seen.lock().unwrap().clone().unwrap();
        assert_eq!(staged.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn loader_panic_is_reported_as_unreadable() {
        let services = services(Arc::new(PanickingLoader), true);
        let err = ingest(&services, upload("a.pdf", b"%PDF-1.4")).await.unwrap_err();
        assert!(matches!(err, IngestError::Unreadable(_)));
        assert!(err.to_string().starts_with("Error reading PDF: "));
    }

    #[tokio::test]
    async fn pages_without_text_are_rejected() {
        let services = services(Arc::new(RecordingLoader::default()), true);
        let err = ingest(&services, upload("blank.pdf", b" \x0C \n")).await.unwrap_err();
        assert!(matches!(err, IngestError::NoText));
    }

    #[tokio::test]
    async fn missing_chat_model_fails_the_upload() {
        let services = services(Arc::new(RecordingLoader::default()), false);
        let err = ingest(&services, upload("a.pdf", b"some text")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "An error occurred: chat model is not configured (set MISTRAL_API_KEY)"
        );
    }

    #[tokio::test]
    async fn missing_embedder_fails_the_upload() {
        let mut services = services(Arc::new(RecordingLoader::default()), true);
        services.embedder = None;
        let err = ingest(&services, upload("a.pdf", b"some text")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "An error occurred: embedding model is not configured (set MISTRAL_API_KEY)"
        );
    }
}
