//! `docchat-server` serves a single-document question answering API:
//! upload a PDF, then ask questions about it.

pub mod config;
pub mod ingest;
pub mod protocol;
pub mod server;
pub mod state;

pub use config::{AppConfig, ServerConfig};
pub use server::{app_router, run_server};
pub use state::{AppState, DocumentSlot, LoadedDocument, Services};
