//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `export` - Session document rendering and file export
//! - `submit` - HTTP submission of the session document
//! - `script` - Capture script loading (JSON array or JSONL)
//! - `session_store` - File-backed storage for received sessions
//! - `session_server` - Session persistence HTTP endpoint

pub mod export;
pub mod script;
pub mod session_server;
pub mod session_store;
pub mod submit;

// Re-export commonly used types
pub use export::{build_payload, FileExporter, SessionPayload};
pub use session_store::SessionStore;
pub use submit::{HttpSubmitter, SessionSink, SubmissionStatus, SubmitError, SubmitReceipt};
