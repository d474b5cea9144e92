#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end question answering against mocked Ollama, chat-completion and vector-search
// servers. Run with: cargo test --test integration_pipeline

use serial_test::serial;
use std::fs;
use std::path::Path;
use support_qa::QaError;
use support_qa::config::{Config, IndexBackend};
use support_qa::pipeline::{Answer, NO_RELEVANT_DOCUMENTS, answer_question, ask};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LLM_KEY_VAR: &str = "SUPPORT_QA_INTEGRATION_LLM_KEY";
const INDEX_KEY_VAR: &str = "SUPPORT_QA_INTEGRATION_INDEX_KEY";

const DOCUMENTS: &[&str] = &[
    "Refunds are issued to the original payment method within 5 business days.",
    "To reset your password, click 'Forgot password' on the login page.",
    "Orders ship within 24 hours from our Rotterdam warehouse.",
    "Support is available Monday to Friday, 9:00 to 17:00 CET.",
];

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore error if already initialized
}

fn set_key(var: &str, value: &str) {
    // SAFETY: every test that touches the environment is `#[serial]`, so no other thread
    // reads or writes it concurrently.
    unsafe { std::env::set_var(var, value) };
}

fn write_flat_index(path: &Path, dimension: usize, vectors: &[[f32; 3]]) {
    let mut bytes = b"IxFI".to_vec();
    bytes.extend_from_slice(&(dimension as i32).to_le_bytes());
    bytes.extend_from_slice(&(vectors.len() as i64).to_le_bytes());
    bytes.extend_from_slice(&(1_i64 << 20).to_le_bytes());
    bytes.extend_from_slice(&(1_i64 << 20).to_le_bytes());
    bytes.push(1);
    bytes.extend_from_slice(&0_i32.to_le_bytes());
    bytes.extend_from_slice(&((vectors.len() * dimension) as u64).to_le_bytes());
    for value in vectors.iter().flatten() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    fs::write(path, bytes).expect("should write index");
}

fn write_documents(path: &Path, documents: &[&str]) {
    fs::write(
        path,
        serde_json::to_string(documents).expect("documents serialize"),
    )
    .expect("should write documents");
}

async fn mock_embedding(server: &MockServer, embedding: [f32; 3]) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "all-minilm:latest",
            "embeddings": [embedding]
        })))
        .mount(server)
        .await;
}

async fn mock_completion(server: &MockServer, answer: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("Authorization", "Bearer llm-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": answer } }]
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn config_for(dir: &TempDir, ollama: &MockServer, llm: &MockServer) -> Config {
    let mut config = Config::default();
    let address = ollama.address();
    config.ollama.host = address.ip().to_string();
    config.ollama.port = address.port();
    config.llm.api_url = format!("{}/openai/v1/chat/completions", llm.uri());
    config.llm.api_key_env = LLM_KEY_VAR.to_string();
    config.index.documents_path = dir.path().join("documents.json");
    config.index.index_path = dir.path().join("faiss_index.index");
    config
}

#[tokio::test]
#[serial]
async fn flat_index_end_to_end() {
    init_test_tracing();
    set_key(LLM_KEY_VAR, "llm-test-key");

    let dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let llm = MockServer::start().await;

    mock_embedding(&ollama, [0.0, 1.0, 0.0]).await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.1-8b-instant",
            "temperature": 0.5,
            "max_tokens": 512
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Use 'Forgot password'." } }]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let config = config_for(&dir, &ollama, &llm);
    write_documents(&config.index.documents_path, DOCUMENTS);
    write_flat_index(
        &config.index.index_path,
        3,
        &[
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.6, 0.8],
            [0.0, 0.3, 0.9],
        ],
    );

    let answer = tokio::task::spawn_blocking(move || answer_question(&config, "I forgot my password"))
        .await
        .expect("task completes")
        .expect("question is answered");

    assert_eq!(answer, Answer::Generated("Use 'Forgot password'.".to_string()));

    let requests = llm.received_requests().await.expect("requests are recorded");
    let body: serde_json::Value = requests[0].body_json().expect("body is json");
    let user_message = body["messages"][1]["content"]
        .as_str()
        .expect("user message is a string");
    // top 3 by inner product: ordinals 1, 2, 3
    let expected_context = format!("{}\n\n{}\n\n{}", DOCUMENTS[1], DOCUMENTS[2], DOCUMENTS[3]);
    assert_eq!(
        user_message,
        format!("Context:\n{}\n\nQuestion: I forgot my password", expected_context)
    );
}

#[tokio::test]
#[serial]
async fn context_budget_is_applied_end_to_end() {
    set_key(LLM_KEY_VAR, "llm-test-key");

    let dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let llm = MockServer::start().await;
    mock_embedding(&ollama, [1.0, 0.0, 0.0]).await;
    mock_completion(&llm, "short", 1).await;

    let mut config = config_for(&dir, &ollama, &llm);
    config.retrieval.max_context_chars = 100;
    let long_document = "a".repeat(300);
    write_documents(&config.index.documents_path, &[long_document.as_str(), "b"]);
    write_flat_index(
        &config.index.index_path,
        3,
        &[[1.0, 0.0, 0.0], [0.5, 0.0, 0.0]],
    );

    let answer = tokio::task::spawn_blocking(move || ask(&config, "question"))
        .await
        .expect("task completes");
    assert_eq!(answer, "short");

    let requests = llm.received_requests().await.expect("requests are recorded");
    let body: serde_json::Value = requests[0].body_json().expect("body is json");
    let user_message = body["messages"][1]["content"]
        .as_str()
        .expect("user message is a string");
    assert_eq!(
        user_message,
        format!("Context:\n{}\n\nQuestion: question", "a".repeat(98))
    );
}

#[tokio::test]
#[serial]
async fn empty_documents_never_reach_the_llm() {
    set_key(LLM_KEY_VAR, "llm-test-key");

    let dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let llm = MockServer::start().await;
    mock_embedding(&ollama, [1.0, 0.0, 0.0]).await;
    mock_completion(&llm, "unused", 0).await;

    let config = config_for(&dir, &ollama, &llm);
    write_documents(&config.index.documents_path, &[]);
    write_flat_index(&config.index.index_path, 3, &[[1.0, 0.0, 0.0]]);

    let answer = tokio::task::spawn_blocking(move || ask(&config, "anything"))
        .await
        .expect("task completes");
    assert_eq!(answer, NO_RELEVANT_DOCUMENTS);
}

#[tokio::test]
#[serial]
async fn llm_failure_becomes_error_string() {
    set_key(LLM_KEY_VAR, "llm-test-key");

    let dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let llm = MockServer::start().await;
    mock_embedding(&ollama, [1.0, 0.0, 0.0]).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&llm)
        .await;

    let config = config_for(&dir, &ollama, &llm);
    write_documents(&config.index.documents_path, DOCUMENTS);
    write_flat_index(&config.index.index_path, 3, &[[1.0, 0.0, 0.0]]);

    let answer = tokio::task::spawn_blocking(move || ask(&config, "question"))
        .await
        .expect("task completes");
    assert!(answer.starts_with("Error: Network error: LLM API request failed"));
    assert!(answer.contains("503"));
}

#[tokio::test]
#[serial]
async fn hosted_index_end_to_end() {
    set_key(LLM_KEY_VAR, "llm-test-key");
    set_key(INDEX_KEY_VAR, "index-test-key");

    let dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let llm = MockServer::start().await;
    let vector_search = MockServer::start().await;
    mock_embedding(&ollama, [0.1, 0.2, 0.3]).await;
    mock_completion(&llm, "Orders ship within a day.", 1).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Api-Key", "index-test-key"))
        .and(body_partial_json(serde_json::json!({ "topK": 3, "namespace": "faq" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "matches": [
                { "id": "2", "score": 0.93 },
                { "id": "17", "score": 0.51 }
            ]
        })))
        .expect(1)
        .mount(&vector_search)
        .await;

    let mut config = config_for(&dir, &ollama, &llm);
    config.index.backend = IndexBackend::Hosted;
    config.index.hosted.host = vector_search.uri();
    config.index.hosted.namespace = Some("faq".to_string());
    config.index.hosted.api_key_env = INDEX_KEY_VAR.to_string();
    write_documents(&config.index.documents_path, DOCUMENTS);

    let answer = tokio::task::spawn_blocking(move || answer_question(&config, "When will it ship?"))
        .await
        .expect("task completes")
        .expect("question is answered");
    assert_eq!(answer.text(), "Orders ship within a day.");

    let requests = llm.received_requests().await.expect("requests are recorded");
    let body: serde_json::Value = requests[0].body_json().expect("body is json");
    let user_message = body["messages"][1]["content"]
        .as_str()
        .expect("user message is a string");
    // ordinal 17 is out of range and dropped
    assert_eq!(
        user_message,
        format!("Context:\n{}\n\nQuestion: When will it ship?", DOCUMENTS[2])
    );
}

#[tokio::test]
#[serial]
async fn missing_llm_key_makes_no_requests() {
    // SAFETY: serialized with the other environment tests
    unsafe { std::env::remove_var(LLM_KEY_VAR) };

    let dir = TempDir::new().expect("should create temp dir");
    let ollama = MockServer::start().await;
    let llm = MockServer::start().await;

    let config = config_for(&dir, &ollama, &llm);
    write_documents(&config.index.documents_path, DOCUMENTS);
    write_flat_index(&config.index.index_path, 3, &[[1.0, 0.0, 0.0]]);

    let result = tokio::task::spawn_blocking(move || answer_question(&config, "question"))
        .await
        .expect("task completes");
    assert!(matches!(result, Err(QaError::MissingApiKey { .. })));

    let embed_requests = ollama.received_requests().await.expect("requests are recorded");
    let llm_requests = llm.received_requests().await.expect("requests are recorded");
    assert!(embed_requests.is_empty());
    assert!(llm_requests.is_empty());
}
