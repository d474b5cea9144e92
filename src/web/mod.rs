//! Single-page question form
//!
//! `GET /` renders the form; `POST /` answers the submitted question and renders the form
//! again with the result underneath.


use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::pipeline::{Answer, answer_question};
use crate::{QaError, Result};

pub const INVALID_QUESTION: &str = "Please enter a valid question.";

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub query: String,
}

/// What the page shows below the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answer(String),
    Notice(String),
    Warning(String),
    Error(String),
}

pub struct AppState {
    pub config: Config,
}

#[inline]
pub fn router(config: Config) -> Router {
    let state = Arc::new(AppState { config });

    Router::new()
        .route("/", get(index_handler).post(ask_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve the form until the process is stopped
#[inline]
pub async fn serve(config: Config, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Serving question form on http://{}", listener.local_addr()?);

    axum::serve(listener, router(config))
        .await
        .map_err(QaError::Io)
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

async fn index_handler() -> Html<String> {
    Html(render_page("", None))
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AskForm>,
) -> impl IntoResponse {
    let query = form.query.trim().to_string();
    if query.is_empty() {
        let page = render_page(&form.query, Some(&Outcome::Warning(INVALID_QUESTION.to_string())));
        return (StatusCode::OK, Html(page));
    }

    let state_for_task = Arc::clone(&state);
    let question = query.clone();
    let result =
        tokio::task::spawn_blocking(move || answer_question(&state_for_task.config, &question))
            .await;

    let outcome = match result {
        Ok(Ok(Answer::Generated(text))) => Outcome::Answer(text),
        Ok(Ok(answer @ Answer::NoRelevantDocuments)) => Outcome::Notice(answer.text().to_string()),
        Ok(Err(e)) => {
            error!("Question answering failed: {}", e);
            Outcome::Error(format!("Error: {}", e))
        }
        Err(e) => {
            error!("Question answering task failed: {}", e);
            Outcome::Error(format!("Error: {}", e))
        }
    };

    (StatusCode::OK, Html(render_page(&query, Some(&outcome))))
}

#[inline]
pub fn render_page(query: &str, outcome: Option<&Outcome>) -> String {
    let result = match outcome {
        None => String::new(),
        Some(Outcome::Answer(text)) => format!(
            "<section class=\"success\"><h2>Answer:</h2><p>{}</p></section>",
            escape_html(text)
        ),
        Some(Outcome::Notice(text)) => {
            format!("<section class=\"notice\"><p>{}</p></section>", escape_html(text))
        }
        Some(Outcome::Warning(text)) => {
            format!("<section class=\"warning\"><p>{}</p></section>", escape_html(text))
        }
        Some(Outcome::Error(text)) => {
            format!("<section class=\"error\"><p>{}</p></section>", escape_html(text))
        }
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Customer Support Assistant</title>
<style>
body {{ font-family: system-ui; max-width: 720px; margin: 40px auto; padding: 0 16px; }}
input[type=text] {{ width: 100%; padding: 8px; box-sizing: border-box; }}
button {{ margin-top: 8px; padding: 8px 16px; }}
section {{ margin-top: 24px; padding: 12px; border-radius: 6px; white-space: pre-wrap; }}
.success {{ background: #e8f5e9; }}
.notice {{ background: #e3f2fd; }}
.warning {{ background: #fff8e1; }}
.error {{ background: #ffebee; }}
</style>
</head>
<body>
<h1>🧠 Customer Support Assistant</h1>
<form method="post" action="/">
<label for="query">Enter your question:</label>
<input type="text" id="query" name="query" value="{}">
<button type="submit">Get Answer</button>
</form>
{}
</body>
</html>"#,
        escape_html(query),
        result
    )
}

#[inline]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
