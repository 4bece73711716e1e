//! HTTP surface for the HealthMate retrieval-augmented chat backend.
//!
//! Routes:
//!
//! - `GET /health`: Vertex AI configuration status
//! - `POST /ingest`: upload a PDF (multipart field `file`) and index it
//! - `POST /chat`: answer a question from retrieved context
//! - `POST /debug/retrieve`: show what retrieval returns for a query

pub mod error;
pub mod handlers;
mod routes;
pub mod settings;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use settings::{RetrievalMode, Settings};
pub use state::AppState;
