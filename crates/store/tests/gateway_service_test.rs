//! Gateway service tests: system message resolution and dedup-then-generate

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use llmgate_common::{GatewayError, ProviderCredentials, Result};
use llmgate_llm::{
    content_hash, ClientOptions, EmbeddingRecord, GenerationRequest, GenerationResult,
    LlmProvider, ProviderClient, RetryPolicy,
};
use llmgate_store::{GatewayService, MemoryStore, NewSystemMessage, RecordStore};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Provider double that echoes its input and counts calls
#[derive(Default)]
struct CountingProvider {
    text_calls: AtomicUsize,
    embed_calls: AtomicUsize,
    empty_vectors: bool,
}

#[async_trait]
impl LlmProvider for CountingProvider {
    async fn generate_text(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerationResult {
            text: format!("echo: {}", request.prompt),
            raw: json!({"text": request.prompt}),
            used_context: request.context_texts,
            used_system_message: request.system_message,
        })
    }

    async fn generate_embedding(
        &self,
        text: &str,
        model: Option<&str>,
    ) -> Result<EmbeddingRecord> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        let embedding = if self.empty_vectors {
            Vec::new()
        } else {
            vec![text.len() as f32, 1.0]
        };
        Ok(EmbeddingRecord {
            text: text.to_string(),
            text_hash: content_hash(text),
            embedding,
            model: model.unwrap_or("fake-embed").to_string(),
        })
    }
}

fn service_with(provider: Arc<CountingProvider>) -> (GatewayService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = GatewayService::new(provider, store.clone());
    (service, store)
}

#[tokio::test]
async fn test_generate_applies_stored_system_message() {
    let provider = Arc::new(CountingProvider::default());
    let (service, store) = service_with(provider.clone());

    let message = store
        .create_system_message(NewSystemMessage::new("tutor", "Answer like a tutor"))
        .await
        .unwrap();

    let reply = service
        .generate(
            GenerationRequest::new("What is Rust?").with_context(["Rust is a language"]),
            Some(message.id),
        )
        .await
        .unwrap();

    assert_eq!(reply.result.text, "echo: What is Rust?");
    assert_eq!(
        reply.result.used_system_message.as_deref(),
        Some("Answer like a tutor")
    );
    assert_eq!(reply.system_message, Some(message));
    assert_eq!(provider.text_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_generate_unknown_system_message_is_not_found() {
    let provider = Arc::new(CountingProvider::default());
    let (service, _store) = service_with(provider.clone());

    let err = service
        .generate(GenerationRequest::new("hi"), Some(99))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert_eq!(provider.text_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generate_without_system_message() {
    let provider = Arc::new(CountingProvider::default());
    let (service, _store) = service_with(provider);

    let reply = service
        .generate(GenerationRequest::new("plain"), None)
        .await
        .unwrap();
    assert!(reply.system_message.is_none());
    assert!(reply.result.used_system_message.is_none());
}

#[tokio::test]
async fn test_embed_reuses_stored_record() {
    let provider = Arc::new(CountingProvider::default());
    let (service, store) = service_with(provider.clone());

    let first = service.embed("same text", None).await.unwrap();
    let second = service.embed("same text", None).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.embedding, second.embedding);
    assert_eq!(first.embedding.text_hash(), content_hash("same text"));
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.stats().await, (1, 0));

    // One extra space is different content
    let third = service.embed("same text ", None).await.unwrap();
    assert!(!third.cached);
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_embed_refuses_to_store_empty_vector() {
    let provider = Arc::new(CountingProvider {
        empty_vectors: true,
        ..CountingProvider::default()
    });
    let (service, store) = service_with(provider);

    let err = service.embed("nothing back", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::Provider(_)));
    assert_eq!(err.status_code(), 502);
    assert_eq!(store.stats().await, (0, 0));
}

#[tokio::test]
async fn test_embed_calls_provider_once_per_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_json(json!({"model": "gemini-embed-1", "text": "cache me"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.5, 0.5]})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = ProviderCredentials::default()
        .with_api_key("test-key")
        .with_embed_endpoint(format!("{}/embed", server.uri()));
    let client = ProviderClient::new(
        credentials,
        ClientOptions {
            retry: RetryPolicy::no_wait(),
            ..ClientOptions::default()
        },
    )
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let service = GatewayService::new(Arc::new(client), store.clone());

    for _ in 0..3 {
        let outcome = service.embed("cache me", None).await.unwrap();
        assert_eq!(outcome.embedding.record.embedding, vec![0.5, 0.5]);
    }

    let listed = service.store().list_embeddings(0, 10).await.unwrap();
    assert_eq!(listed.len(), 1);
}
