use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "all-minilm:latest");
    assert_eq!(config.ollama.embedding_dimension, 384);
    assert_eq!(config.llm.model, "llama-3.1-8b-instant");
    assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
    assert_eq!(config.llm.max_tokens, 512);
    assert!((config.llm.temperature - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.retrieval.max_context_chars, 4000);
    assert_eq!(config.index.backend, IndexBackend::Flat);
    assert_eq!(config.index.documents_path, PathBuf::from("documents.json"));
    assert_eq!(config.index.index_path, PathBuf::from("faiss_index.index"));
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.llm.api_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.llm.api_key_env = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.llm.temperature = 3.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.retrieval.max_context_chars = 10;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn hosted_backend_requires_host() {
    let mut config = Config::default();
    config.index.backend = IndexBackend::Hosted;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingHostedIndexHost)
    ));

    config.index.hosted.host = "docs-abc123.svc.us-east-1.pinecone.io".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn hosted_host_without_scheme_defaults_to_https() {
    let hosted = HostedIndexConfig {
        host: "docs-abc123.svc.pinecone.io".to_string(),
        ..HostedIndexConfig::default()
    };
    let url = hosted.host_url().expect("host should parse");
    assert_eq!(url.as_str(), "https://docs-abc123.svc.pinecone.io/");

    let local = HostedIndexConfig {
        host: "http://localhost:5080".to_string(),
        ..HostedIndexConfig::default()
    };
    let url = local.host_url().expect("host should parse");
    assert_eq!(url.as_str(), "http://localhost:5080/");
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.index.hosted.namespace = Some("support".to_string());
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let toml_str = r#"
        [retrieval]
        top_k = 5

        [index]
        backend = "hosted"

        [index.hosted]
        host = "docs.svc.pinecone.io"
    "#;

    let config: Config = toml::from_str(toml_str).expect("should parse partial toml");
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.retrieval.max_context_chars, 4000);
    assert_eq!(config.index.backend, IndexBackend::Hosted);
    assert_eq!(config.index.hosted.api_key_env, "PINECONE_API_KEY");
    assert_eq!(config.llm, LlmConfig::default());
}

#[test]
fn unknown_backend_is_rejected() {
    let toml_str = r#"
        [index]
        backend = "lance"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(toml_str);
    assert!(result.is_err());
}

#[test]
fn setter_validation() {
    let mut ollama = OllamaConfig::default();
    assert!(ollama.set_protocol("https".to_string()).is_ok());
    assert!(ollama.set_host("example.com".to_string()).is_ok());
    assert!(ollama.set_port(8080).is_ok());
    assert!(ollama.set_model("nomic-embed-text".to_string()).is_ok());
    assert!(ollama.set_embedding_dimension(768).is_ok());

    assert!(ollama.set_protocol("ftp".to_string()).is_err());
    assert!(ollama.set_protocol("HTTP".to_string()).is_err()); // case sensitive
    assert!(ollama.set_port(0).is_err());
    assert!(ollama.set_model("   ".to_string()).is_err());
    assert!(ollama.set_embedding_dimension(32).is_err());

    let mut llm = LlmConfig::default();
    assert!(llm.set_api_url("http://localhost:8000/v1/chat/completions".to_string()).is_ok());
    assert!(llm.set_temperature(0.0).is_ok());
    assert!(llm.set_max_tokens(1024).is_ok());
    assert!(llm.set_api_url("ftp://example.com".to_string()).is_err());
    assert!(llm.set_temperature(-0.1).is_err());
    assert!(llm.set_max_tokens(0).is_err());

    let mut retrieval = RetrievalConfig::default();
    assert!(retrieval.set_top_k(10).is_ok());
    assert!(retrieval.set_max_context_chars(8000).is_ok());
    assert!(retrieval.set_top_k(101).is_err());
    assert!(retrieval.set_max_context_chars(99).is_err());
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load_from(temp_dir.path()).expect("missing config falls back");
    assert_eq!(config.base_dir.as_deref(), Some(temp_dir.path()));
    assert_eq!(config.llm, LlmConfig::default());
    assert_eq!(config.retrieval, RetrievalConfig::default());
}

#[test]
fn save_then_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_dir = temp_dir.path().join(".support-qa");

    let mut config = Config {
        base_dir: Some(config_dir.clone()),
        ..Config::default()
    };
    config.llm.model = "llama-3.3-70b-versatile".to_string();
    config.retrieval.top_k = 4;
    config.save().expect("config saves");

    assert!(config_dir.join("config.toml").exists());

    let loaded = Config::load_from(&config_dir).expect("config loads");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 0\n",
    )
    .expect("should write config");

    assert!(Config::load_from(temp_dir.path()).is_err());
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::InvalidProtocol("ftp".to_string()),
        ConfigError::InvalidPort(0),
        ConfigError::InvalidModel(String::new()),
        ConfigError::InvalidUrl("invalid-url".to_string()),
        ConfigError::InvalidTopK(0),
        ConfigError::MissingHostedIndexHost,
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10);
    }
}
