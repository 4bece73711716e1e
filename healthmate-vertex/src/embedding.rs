//! Request and response types for text embeddings served by `:predict`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingInstance {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingParameters {
    /// Truncate vectors to this length (models that support it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensionality: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictEmbeddingsRequest {
    pub instances: Vec<EmbeddingInstance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<EmbeddingParameters>,
}

impl PredictEmbeddingsRequest {
    pub fn new<I, S>(texts: I, task_type: TaskType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let instances = texts
            .into_iter()
            .map(|text| EmbeddingInstance {
                content: text.into(),
                task_type: Some(task_type),
                title: None,
            })
            .collect();
        Self { instances, parameters: None }
    }

    pub fn with_parameters(mut self, parameters: EmbeddingParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmbeddingStatistics {
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub token_count: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Embeddings {
    pub values: Vec<f32>,
    #[serde(default)]
    pub statistics: Option<EmbeddingStatistics>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub embeddings: Embeddings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictEmbeddingsResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

impl PredictEmbeddingsResponse {
    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.predictions.into_iter().map(|p| p.embeddings.values).collect()
    }
}
