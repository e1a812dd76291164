//! HTTP API tests: the router is served on an ephemeral port with a scripted
//! model and exercised over real HTTP.

use anyhow::Result;
use async_trait::async_trait;
use chapter_tutor::corpus::Corpus;
use chapter_tutor::llm::{ChatModel, Conversation};
use chapter_tutor::server::router;
use chapter_tutor::tutor::Tutor;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ANSWER: &str =
    "Photosynthesis is the process plants use to convert light into chemical energy.";

struct ScriptedModel {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(reply: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _conversation: &Conversation) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(format!("  {}\n", reply)),
            None => anyhow::bail!("connection refused"),
        }
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(model: Arc<ScriptedModel>) -> Self {
        let corpus = Corpus::from_documents([
            ("Chapter1", "Photosynthesis converts light to energy."),
            ("Chapter2", "Acids turn blue litmus red."),
            ("Chapter5", ""),
        ]);
        let tutor = Arc::new(Tutor::new(Arc::new(corpus), model));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(tutor)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_list_chapters() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let (status, body) = server.get("/api/chapters").await;

    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "status": "success", "chapters": ["Chapter1", "Chapter2"], "count": 2 })
    );
}

#[tokio::test]
async fn test_chapter_info() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let (status, body) = server.get("/api/chapters/Chapter1").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["chapter"], "Chapter1");
    assert_eq!(
        body["content_length"],
        "Photosynthesis converts light to energy.".len()
    );
}

#[tokio::test]
async fn test_chapter_info_not_found() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    for name in ["Chapter99", "Chapter5"] {
        let (status, body) = server.get(&format!("/api/chapters/{}", name)).await;
        assert_eq!(status, 404, "{}", name);
        assert_eq!(body, json!({ "status": "error", "message": "Chapter not found" }));
    }
}

#[tokio::test]
async fn test_ask_success() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    let (status, body) = server
        .post(
            "/api/ask",
            json!({ "chapter": "Chapter1", "question": "What is photosynthesis?" }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["chapter"], "Chapter1");
    assert_eq!(body["question"], "What is photosynthesis?");
    assert_eq!(body["response"], ANSWER);
    assert!(body["time_taken"].as_f64().unwrap() >= 0.0);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_ask_unknown_chapter_is_generation_failure() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    let (status, body) = server
        .post("/api/ask", json!({ "chapter": "Chapter99", "question": "anything" }))
        .await;

    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({ "status": "error", "message": "Failed to generate response" })
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_ask_model_failure() {
    let model = ScriptedModel::new(None);
    let server = TestServer::start(model.clone()).await;

    let (status, body) = server
        .post("/api/ask", json!({ "chapter": "Chapter2", "question": "What is an acid?" }))
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["message"], "Failed to generate response");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_ask_missing_fields() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    for body in [
        json!({ "chapter": "Chapter1" }),
        json!({ "question": "What is photosynthesis?" }),
        json!({ "chapter": 1, "question": "What is photosynthesis?" }),
        json!({}),
        json!(null),
    ] {
        let (status, resp) = server.post("/api/ask", body.clone()).await;
        assert_eq!(status, 400, "{}", body);
        assert_eq!(
            resp,
            json!({ "status": "error", "message": "Missing required fields: chapter and question" })
        );
    }
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_ask_unparsable_body() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let resp = server
        .client
        .post(format!("{}/api/ask", server.base))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_chapter_route_success() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    let (status, body) = server
        .post("/api/chapter1", json!({ "question": "What is photosynthesis?" }))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["chapter"], "Chapter1");
    assert_eq!(body["response"], ANSWER);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_chapter_route_missing_question() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    let (status, body) = server
        .post("/api/chapter1", json!({ "chapter": "Chapter1" }))
        .await;

    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({ "status": "error", "message": "Missing required field: question" })
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_chapter_route_unloaded_chapter() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    let (status, body) = server
        .post("/api/chapter13", json!({ "question": "What is a fossil?" }))
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["message"], "Failed to generate response for Chapter13");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_chapter_route_out_of_range() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let (status, body) = server
        .post("/api/chapter14", json!({ "question": "q" }))
        .await;

    assert_eq!(status, 404);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let (status, body) = server.get("/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_cors_headers_present() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let resp = server
        .client
        .get(format!("{}/api/chapters", server.base))
        .header("Origin", "http://localhost:8080")
        .send()
        .await
        .unwrap();

    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_unknown_route_returns_envelope() {
    let server = TestServer::start(ScriptedModel::new(Some(ANSWER))).await;

    let (status, body) = server.get("/api/chapters/Chapter1/pages").await;

    assert_eq!(status, 404);
    assert_eq!(body, json!({ "status": "error", "message": "Not found" }));
}

#[tokio::test]
async fn test_wrong_method_returns_envelope() {
    let model = ScriptedModel::new(Some(ANSWER));
    let server = TestServer::start(model.clone()).await;

    for path in ["/api/chapter1", "/api/ask"] {
        let (status, body) = server.get(path).await;
        assert_eq!(status, 405, "{}", path);
        assert_eq!(
            body,
            json!({ "status": "error", "message": "Method not allowed" })
        );
    }
    assert_eq!(model.calls(), 0);
}
