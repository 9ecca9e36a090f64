use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use async_trait::async_trait;
use log::{ error, info };
use uuid::Uuid;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition,
    CreateCollection,
    CreateFieldIndexCollection,
    DeletePointsBuilder,
    Direction,
    Distance,
    FieldType,
    Filter,
    OrderBy,
    PointStruct,
    ScrollPoints,
    SearchPoints,
    UpsertPoints,
    Value as QdrantValue,
    VectorParams,
    VectorsConfig,
    WithPayloadSelector,
    with_payload_selector::SelectorOptions as WithPayloadOptions,
};

use crate::cli::Args;
use crate::error::{ AgentError, ConfigError, HistoryError };
use crate::llm::embedding::EmbeddingClient;
use crate::models::chat::{ MessageRecord, Role };
use super::HistoryStore;

/// Remote vector-index backend. Every record is embedded at write time and
/// upserted with its conversation id as payload; the conversation scope is a
/// structured payload filter, and retrieval is an approximate similarity
/// query bounded by `top_k`, lossy with respect to the full history.
pub struct QdrantHistoryStore {
    client: Qdrant,
    collection_name: String,
    embedding_client: Arc<dyn EmbeddingClient>,
    vector_dim: u64,
    distance: Distance,
    top_k: u64,
    collection_ready: AtomicBool,
}

pub(crate) fn parse_distance(metric: &str) -> Result<Distance, ConfigError> {
    match metric.to_lowercase().as_str() {
        "cosine" => Ok(Distance::Cosine),
        "euclid" | "euclidean" | "l2" => Ok(Distance::Euclid),
        "dot" | "dotproduct" | "ip" => Ok(Distance::Dot),
        other => Err(ConfigError::Invalid(format!("unsupported distance metric: {}", other))),
    }
}

fn conversation_filter(conversation_id: &str) -> Filter {
    Filter::must([Condition::matches("conversation_id", conversation_id.to_string())])
}

fn payload_to_record(
    conversation_id: &str,
    payload: HashMap<String, QdrantValue>
) -> Option<MessageRecord> {
    let role = Role::from_str(payload.get("role")?.as_str()?).ok()?;
    let content = payload.get("content")?.as_str()?.to_string();
    let sequence = payload.get("sequence")?.as_integer()?;

    Some(MessageRecord::new(conversation_id, role, &content, sequence))
}

impl QdrantHistoryStore {
    /// Connect and run the collection-presence check up front, so a missing
    /// collection is created with the configured dimensionality and metric
    /// before any write or read is attempted.
    pub async fn connect(
        args: &Args,
        embedding_client: Arc<dyn EmbeddingClient>
    ) -> Result<Self, AgentError> {
        let client = Qdrant::from_url(&args.history_url)
            .api_key(args.history_api_key.clone())
            .build()
            .map_err(HistoryError::from)?;

        let store = Self {
            client,
            collection_name: args.collection.clone(),
            embedding_client,
            vector_dim: args.dimension as u64,
            distance: parse_distance(&args.metric)?,
            top_k: args.top_k as u64,
            collection_ready: AtomicBool::new(false),
        };

        store.ensure_collection().await?;
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), HistoryError> {
        if self.collection_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        if !self.client.collection_exists(&self.collection_name).await? {
            self.client.create_collection(CreateCollection {
                collection_name: self.collection_name.clone(),
                vectors_config: Some(
                    VectorsConfig::from(VectorParams {
                        size: self.vector_dim,
                        distance: self.distance.into(),
                        ..Default::default()
                    })
                ),
                ..Default::default()
            }).await?;
            info!("Created history collection: {}", self.collection_name);

            self.client.create_field_index(CreateFieldIndexCollection {
                collection_name: self.collection_name.clone(),
                field_name: "conversation_id".to_string(),
                field_type: Some(FieldType::Keyword.into()),
                wait: Some(true),
                ..Default::default()
            }).await?;

            self.client.create_field_index(CreateFieldIndexCollection {
                collection_name: self.collection_name.clone(),
                field_name: "sequence".to_string(),
                field_type: Some(FieldType::Integer.into()),
                wait: Some(true),
                ..Default::default()
            }).await?;
        }

        self.collection_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Most recent record of the conversation, used to seed the similarity
    /// query.
    async fn latest_record(
        &self,
        conversation_id: &str
    ) -> Result<Option<MessageRecord>, HistoryError> {
        let scroll = ScrollPoints {
            collection_name: self.collection_name.clone(),
            filter: Some(conversation_filter(conversation_id)),
            limit: Some(1),
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(WithPayloadOptions::Enable(true)),
            }),
            order_by: Some(OrderBy {
                key: "sequence".to_string(),
                direction: Some(Direction::Desc.into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self.client.scroll(scroll).await?;
        Ok(
            response.result
                .into_iter()
                .next()
                .and_then(|point| payload_to_record(conversation_id, point.payload))
        )
    }
}

#[async_trait]
impl HistoryStore for QdrantHistoryStore {
    async fn append(&self, record: MessageRecord) -> Result<(), HistoryError> {
        record.validate()?;
        self.ensure_collection().await?;

        let vector = self.embedding_client
            .embed(&record.content).await
            .map_err(|e| HistoryError::BackendUnavailable(e.to_string()))?
            .embedding;

        if (vector.len() as u64) != self.vector_dim {
            return Err(
                HistoryError::BackendUnavailable(
                    format!(
                        "embedding dimension mismatch: expected {}, got {}",
                        self.vector_dim,
                        vector.len()
                    )
                )
            );
        }

        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("conversation_id".to_string(), record.conversation_id.clone().into());
        payload.insert("role".to_string(), record.role.as_str().to_string().into());
        payload.insert("content".to_string(), record.content.clone().into());
        payload.insert("sequence".to_string(), record.sequence.into());

        let point = PointStruct::new(Uuid::new_v4().to_string(), vector, payload);
        self.client.upsert_points(UpsertPoints {
            collection_name: self.collection_name.clone(),
            wait: Some(true),
            points: vec![point],
            ordering: None,
            shard_key_selector: None,
            update_filter: None,
            timeout: None,
            update_mode: None,
        }).await?;

        Ok(())
    }

    async fn search(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, HistoryError> {
        self.ensure_collection().await?;

        let latest = match self.latest_record(conversation_id).await? {
            Some(record) => record,
            None => {
                return Ok(Vec::new());
            }
        };

        let query_vector = self.embedding_client
            .embed(&latest.content).await
            .map_err(|e| HistoryError::BackendUnavailable(e.to_string()))?
            .embedding;

        let response = self.client.search_points(SearchPoints {
            collection_name: self.collection_name.clone(),
            vector: query_vector,
            filter: Some(conversation_filter(conversation_id)),
            limit: self.top_k,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(WithPayloadOptions::Enable(true)),
            }),
            ..Default::default()
        }).await?;

        let mut messages: Vec<MessageRecord> = Vec::new();
        for point in response.result {
            match payload_to_record(conversation_id, point.payload) {
                Some(record) => messages.push(record),
                None => error!("Skipping point with undecodable payload in {}", self.collection_name),
            }
        }
        messages.sort_by_key(|m| m.sequence);

        Ok(messages)
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), HistoryError> {
        self.ensure_collection().await?;

        self.client.delete_points(
            DeletePointsBuilder::new(&self.collection_name)
                .points(conversation_filter(conversation_id))
                .wait(true)
        ).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_filter_is_structured_equality() {
        let filter = conversation_filter("c1");
        assert_eq!(filter.must.len(), 1);
        assert!(filter.must_not.is_empty());
        assert!(filter.should.is_empty());
    }

    #[test]
    fn payload_round_trips_to_record() {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("conversation_id".to_string(), "c1".to_string().into());
        payload.insert("role".to_string(), "assistant".to_string().into());
        payload.insert("content".to_string(), "hola".to_string().into());
        payload.insert("sequence".to_string(), 42i64.into());

        let record = payload_to_record("c1", payload).unwrap();
        assert_eq!(record.role, Role::Assistant);
        assert_eq!(record.content, "hola");
        assert_eq!(record.sequence, 42);
    }

    #[test]
    fn payload_missing_fields_is_none() {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("content".to_string(), "hola".to_string().into());
        assert!(payload_to_record("c1", payload).is_none());
    }

    #[test]
    fn metric_names_parse_to_distances() {
        assert_eq!(parse_distance("cosine").unwrap(), Distance::Cosine);
        assert_eq!(parse_distance("l2").unwrap(), Distance::Euclid);
        assert_eq!(parse_distance("dotproduct").unwrap(), Distance::Dot);
        assert!(parse_distance("hamming").is_err());
    }
}
