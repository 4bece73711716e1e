//! Process configuration read from the environment.
//!
//! `main` loads a `.env` file with `dotenvy` first; every value then comes
//! from `std::env` with the defaults below.

use std::path::PathBuf;
use std::str::FromStr;

use healthmate_rag::RagConfig;
use thiserror::Error;

/// Default upload limit for `/ingest` (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// How `/chat` and `/debug/retrieve` find context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalMode {
    /// Embed the query and search the Pinecone index.
    #[default]
    Vector,
    /// Ask a managed Vertex AI RAG corpus.
    Corpus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,

    pub gcp_project: Option<String>,
    pub gcp_location: String,
    pub vertex_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub temperature: f32,
    pub max_output_tokens: Option<i32>,
    /// Persona for the answer model; the built-in assistant prompt when unset.
    pub system_prompt: Option<String>,
    pub credentials_path: PathBuf,
    pub google_api_key: Option<String>,
    pub google_access_token: Option<String>,

    pub pinecone_api_key: Option<String>,
    pub pinecone_index: Option<String>,
    pub pinecone_namespace: String,
    pub pinecone_cloud: String,
    pub pinecone_region: String,

    pub chunking: RagConfig,
    pub retrieval_mode: RetrievalMode,
    pub rag_corpus: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: PathBuf::from("./data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            gcp_project: None,
            gcp_location: "us-central1".to_string(),
            vertex_model: "gemini-1.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            embedding_dimensions: healthmate_rag::EMBEDDING_DIM,
            temperature: 0.2,
            max_output_tokens: None,
            system_prompt: None,
            credentials_path: PathBuf::from("./google-service.json"),
            google_api_key: None,
            google_access_token: None,
            pinecone_api_key: None,
            pinecone_index: Some("health-mate-index".to_string()),
            pinecone_namespace: "default".to_string(),
            pinecone_cloud: "aws".to_string(),
            pinecone_region: "us-east-1".to_string(),
            chunking: RagConfig::default(),
            retrieval_mode: RetrievalMode::Vector,
            rag_corpus: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset, except
    /// `PINECONE_INDEX`, where a blank value disables the vector index.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_var(&get, "PORT")?.unwrap_or(defaults.port);
        let max_upload_bytes =
            parse_var(&get, "MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);
        let embedding_dimensions =
            parse_var(&get, "EMBEDDING_DIMENSIONS")?.unwrap_or(defaults.embedding_dimensions);
        let temperature = parse_var(&get, "GCP_TEMPERATURE")?.unwrap_or(defaults.temperature);
        let max_output_tokens = parse_var(&get, "GCP_MAX_OUTPUT_TOKENS")?;

        let chunk_size = parse_var(&get, "CHUNK_SIZE")?.unwrap_or(defaults.chunking.chunk_size());
        let chunk_overlap =
            parse_var(&get, "CHUNK_OVERLAP")?.unwrap_or(defaults.chunking.chunk_overlap());
        let chunking = RagConfig::new(chunk_size, chunk_overlap).map_err(|_| {
            SettingsError::Invalid { name: "CHUNK_OVERLAP", value: chunk_overlap.to_string() }
        })?;
        let retrieval_mode = match get("RETRIEVAL_MODE").as_deref().map(str::to_ascii_lowercase) {
            None => RetrievalMode::Vector,
            Some(mode) if mode == "vector" => RetrievalMode::Vector,
            Some(mode) if mode == "corpus" => RetrievalMode::Corpus,
            Some(mode) => {
                return Err(SettingsError::Invalid { name: "RETRIEVAL_MODE", value: mode });
            }
        };
        let pinecone_index = match lookup("PINECONE_INDEX") {
            Some(v) => Some(v.trim().to_string()).filter(|v| !v.is_empty()),
            None => defaults.pinecone_index,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            max_upload_bytes,
            gcp_project: get("GCP_PROJECT"),
            gcp_location: get("GCP_LOCATION").unwrap_or(defaults.gcp_location),
            vertex_model: get("GCP_VERTEX_MODEL").unwrap_or(defaults.vertex_model),
            embedding_model: get("GCP_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimensions,
            temperature,
            max_output_tokens,
            system_prompt: get("SYSTEM_PROMPT"),
            credentials_path: get("GOOGLE_APPLICATION_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
            google_api_key: get("GOOGLE_API_KEY"),
            google_access_token: get("GOOGLE_ACCESS_TOKEN"),
            pinecone_api_key: get("PINECONE_API_KEY"),
            pinecone_index,
            pinecone_namespace: get("PINECONE_NAMESPACE").unwrap_or(defaults.pinecone_namespace),
            pinecone_cloud: get("PINECONE_CLOUD").unwrap_or(defaults.pinecone_cloud),
            pinecone_region: get("PINECONE_REGION").unwrap_or(defaults.pinecone_region),
            chunking,
            retrieval_mode,
            rag_corpus: get("RAG_CORPUS"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, G>(get: &G, name: &'static str) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name).map(|v| v.parse().map_err(|_| SettingsError::Invalid { name, value: v })).transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = from(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind_address(), "0.0.0.0:8000");
        assert_eq!(settings.pinecone_index.as_deref(), Some("health-mate-index"));
    }

    #[test]
    fn values_override_defaults() {
        let settings = from(&[
            ("PORT", "9000"),
            ("GCP_PROJECT", "demo"),
            ("PINECONE_NAMESPACE", "clinic"),
            ("RETRIEVAL_MODE", "Corpus"),
            ("RAG_CORPUS", "projects/demo/locations/us-central1/ragCorpora/1"),
        ])
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.gcp_project.as_deref(), Some("demo"));
        assert_eq!(settings.pinecone_namespace, "clinic");
        assert_eq!(settings.retrieval_mode, RetrievalMode::Corpus);
    }

    #[test]
    fn blank_index_disables_vector_collection() {
        let settings = from(&[("PINECONE_INDEX", "  ")]).unwrap();
        assert_eq!(settings.pinecone_index, None);
    }

    #[test]
    fn bad_numbers_and_modes_are_rejected() {
        assert!(from(&[("PORT", "eighty")]).is_err());
        assert!(from(&[("MAX_UPLOAD_BYTES", "-1")]).is_err());
        assert!(from(&[("RETRIEVAL_MODE", "hybrid")]).is_err());
        assert!(from(&[("GCP_TEMPERATURE", "warm")]).is_err());
    }

    #[test]
    fn model_and_chunking_knobs_are_read() {
        let settings = from(&[
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("EMBEDDING_DIMENSIONS", "256"),
            ("GCP_TEMPERATURE", "0.5"),
            ("GCP_MAX_OUTPUT_TOKENS", "1024"),
            ("SYSTEM_PROMPT", "You are a nutrition coach."),
        ])
        .unwrap();
        assert_eq!(settings.chunking, RagConfig::new(500, 50).unwrap());
        assert_eq!(settings.embedding_dimensions, 256);
        assert!((settings.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.max_output_tokens, Some(1024));
        assert_eq!(settings.system_prompt.as_deref(), Some("You are a nutrition coach."));
    }

    #[test]
    fn overlap_not_below_chunk_size_is_rejected() {
        let err = from(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { name: "CHUNK_OVERLAP", .. }));
    }
}
