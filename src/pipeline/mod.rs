//! Question answering pipeline
//!
//! load resources → embed the question → search the index → truncate the retrieved
//! documents into a context → ask the language model.


use tracing::{debug, error, info, warn};

use crate::config::{Config, IndexConfig};
use crate::documents::DocumentStore;
use crate::embeddings::{Embedder, OllamaClient};
use crate::index::{VectorIndex, open_index};
use crate::llm::{ChatClient, Generator};
use crate::Result;

const SEPARATOR: &str = "\n\n";
const SEPARATOR_LEN: usize = 2;

pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Generated(String),
    NoRelevantDocuments,
}

impl Answer {
    /// Text shown to the user
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::NoRelevantDocuments => NO_RELEVANT_DOCUMENTS,
        }
    }
}

pub struct Resources {
    pub index: Box<dyn VectorIndex>,
    pub documents: DocumentStore,
}

/// Read the index and the document list
#[inline]
pub fn load_resources(config: &IndexConfig) -> Result<Resources> {
    let index = open_index(config)?;
    let documents = DocumentStore::load(&config.documents_path)?;
    Ok(Resources { index, documents })
}

/// Embed `query` and return the texts of its nearest documents in retrieval order.
/// Ordinals outside the document list are skipped.
#[inline]
pub fn search_documents<'d>(
    index: &dyn VectorIndex,
    documents: &'d DocumentStore,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Vec<&'d str>> {
    let query_vector = embedder.embed(query)?;
    let neighbors = index.search(&query_vector, k)?;

    let texts: Vec<&str> = neighbors
        .iter()
        .filter_map(|neighbor| {
            let text = documents.get(neighbor.ordinal);
            if text.is_none() {
                warn!(
                    "Index returned ordinal {} outside {} documents",
                    neighbor.ordinal,
                    documents.len()
                );
            }
            text
        })
        .collect();

    debug!("Retrieved {} of {} requested documents", texts.len(), k);
    Ok(texts)
}

/// Concatenate documents in order, separated by blank lines, stopping once `max_chars`
/// characters are used. The document that crosses the limit is cut to fit.
#[inline]
pub fn truncate_context<S: AsRef<str>>(documents: &[S], max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0;

    for document in documents {
        let document = document.as_ref();
        let length = document.chars().count();

        if used + length + SEPARATOR_LEN > max_chars {
            let remaining = max_chars.saturating_sub(used + SEPARATOR_LEN);
            context.extend(document.chars().take(remaining));
            break;
        }

        context.push_str(document);
        context.push_str(SEPARATOR);
        used += length + SEPARATOR_LEN;
    }

    context.trim().to_string()
}

pub struct Pipeline {
    index: Box<dyn VectorIndex>,
    documents: DocumentStore,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    top_k: usize,
    max_context_chars: usize,
}

impl Pipeline {
    #[inline]
    pub fn new(
        resources: Resources,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Self {
        let defaults = crate::config::RetrievalConfig::default();
        Self {
            index: resources.index,
            documents: resources.documents,
            embedder,
            generator,
            top_k: defaults.top_k,
            max_context_chars: defaults.max_context_chars,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Load resources and build the clients. Fails on a missing API key before any
    /// network request is made.
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let resources = load_resources(&config.index)?;
        let generator = ChatClient::new(&config.llm)?;
        let embedder = OllamaClient::new(&config.ollama)?;

        info!(
            "Answering over {} documents with {} (embeddings: {})",
            resources.documents.len(),
            generator.model(),
            embedder.model()
        );

        Ok(
            Self::new(resources, Box::new(embedder), Box::new(generator))
                .with_top_k(config.retrieval.top_k)
                .with_max_context_chars(config.retrieval.max_context_chars),
        )
    }

    #[inline]
    pub fn answer(&self, query: &str) -> Result<Answer> {
        if self.documents.is_empty() {
            info!("Document store is empty");
            return Ok(Answer::NoRelevantDocuments);
        }

        let retrieved = search_documents(
            self.index.as_ref(),
            &self.documents,
            self.embedder.as_ref(),
            query,
            self.top_k,
        )?;
        if retrieved.is_empty() {
            info!("No relevant documents for query");
            return Ok(Answer::NoRelevantDocuments);
        }

        let context = truncate_context(&retrieved, self.max_context_chars);
        let answer = self.generator.generate(&context, query)?;

        Ok(Answer::Generated(answer))
    }
}

/// Answer one question from scratch. Resources are reloaded on every call.
#[inline]
pub fn answer_question(config: &Config, query: &str) -> Result<Answer> {
    Pipeline::from_config(config)?.answer(query)
}

/// Answer one question, converting any failure into a logged `Error: ...` string
#[inline]
pub fn ask(config: &Config, query: &str) -> String {
    match answer_question(config, query) {
        Ok(answer) => answer.text().to_string(),
        Err(e) => {
            error!("Question answering failed: {}", e);
            format!("Error: {}", e)
        }
    }
}
