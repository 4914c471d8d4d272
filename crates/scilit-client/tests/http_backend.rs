//! HttpNlpBackend against an in-process server speaking the backend's JSON
//! contracts.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{post, MethodRouter};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use scilit_client::{CitationPaper, HttpNlpBackend, NlpBackend};
use scilit_common::error::NetworkError;
use scilit_common::models::{IdValue, PaperIdentifier, SpanAction, TextField};
use scilit_config::Config;

#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<(String, Value)>>>);

impl Recorded {
    fn bodies(&self, endpoint: &str) -> Vec<Value> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn replying(log: &Recorded, name: &'static str, reply: Value) -> MethodRouter {
    let log = log.clone();
    post(move |Json(body): Json<Value>| {
        let log = log.clone();
        let reply = reply.clone();
        async move {
            log.0.lock().unwrap().push((name.to_string(), body));
            Json(json!({ "response": reply }))
        }
    })
}

fn process_route(log: &Recorded) -> MethodRouter {
    let log = log.clone();
    post(move |Json(body): Json<Value>| {
        let log = log.clone();
        async move {
            log.0.lock().unwrap().push(("process".to_string(), body.clone()));
            let reply = match body["mode"].as_str() {
                Some("highlight_text_given_keywords") => json!([{"start": "2", "end": "6"}]),
                Some("highlight_paper_given_ref_sentences") => {
                    let mut paper = body["data"]["paper"].clone();
                    paper["Content"]["Fullbody_Parsed"][0]["section_text"][0]["paragraph_text"][0]["spans"] = json!([
                        {"start": "0", "end": "4", "action": "highlight", "param": {}},
                        {"start": "4", "end": "8", "action": "citation_marker", "param": {"ref_id": 0}},
                        {"start": "8", "end": "14", "action": "none", "param": {}}
                    ]);
                    json!({
                        "highlighted_paper": paper,
                        "ref_sentences_with_matched_sen_ids": [{
                            "text": "• BERT rocks.",
                            "matched_sen_id_info": {
                                "field_name": "fullbody",
                                "section_id": "0",
                                "paragraph_id": "0",
                                "sentence_id": "0"
                            }
                        }]
                    })
                }
                _ => Value::Null,
            };
            Json(json!({ "response": reply }))
        }
    })
}

fn router(log: &Recorded) -> Router {
    Router::new()
        .route(
            "/ml-api/doc-search/v1.0",
            replying(log, "doc-search", json!([
                {"collection": "S2ORC", "id_field": "id_int", "id_type": "int", "id_value": 42},
                {"collection": "arXiv", "id_field": "id_int", "id_type": "int", "id_value": "7"}
            ])),
        )
        .route(
            "/ml-api/get-papers/v1.0",
            replying(log, "get-papers", json!([sample_paper()])),
        )
        .route(
            "/ml-api/extractive-summarize/v1.0",
            replying(log, "extractive-summarize", json!({"summary": ["BERT rocks."]})),
        )
        .route(
            "/ml-api/generate-citation/v1.0",
            replying(log, "generate-citation", json!(["  Devlin et al. proposed BERT.\n", "x "])),
        )
        .route("/ml-api/process/v1.0", process_route(log))
        .route(
            "/ml-api/title-generic-search/v1.0",
            replying(log, "title-generic-search", json!([{"found": true, "collection": "arXiv", "id_value": 9}])),
        )
        .route(
            "/ml-api/citation-formatting-service/v1.0",
            replying(log, "citation-formatting-service", json!([
                {"bibtex": "@article{devlin2019}", "mla": "Devlin, Jacob, et al."},
                {"bibtex": "@ignored", "mla": "ignored"}
            ])),
        )
}

fn sample_paper() -> Value {
    json!({
        "_id": "S2ORC_42",
        "Title": "BERT",
        "Author": [{"GivenName": "Jacob", "FamilyName": "Devlin"}],
        "Venue": "NAACL",
        "PublicationDate": {"Year": "2019", "Month": "6"},
        "URL": "https://example.org/bert.pdf",
        "Content": {
            "Abstract": "We introduce BERT.",
            "Abstract_Parsed": [],
            "Fullbody": "BERT rocks.",
            "Fullbody_Parsed": [{
                "section_id": 0,
                "section_title": "Intro",
                "section_text": [{
                    "paragraph_id": 0,
                    "paragraph_text": [{"sentence_id": 0, "sentence_text": "BERT [1] rocks", "cite_spans": []}]
                }]
            }]
        },
        "Reference": [{"ReferenceText": "Vaswani et al. 2017", "Title": "Attention Is All You Need"}]
    })
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> Config {
    let mut config = Config::default();
    config.backend.base_url = format!("http://{addr}");
    config
}

async fn backend() -> (HttpNlpBackend, Recorded) {
    let log = Recorded::default();
    let addr = spawn(router(&log)).await;
    (HttpNlpBackend::new(&config_for(addr)).unwrap(), log)
}

#[tokio::test]
async fn test_search_escapes_keywords_and_decodes_ids() {
    let (backend, log) = backend().await;
    let ids = backend.search("dense retrieval", "bert;dpr", 100).await.unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0].id_value, IdValue::Int(42));
    assert_eq!(ids[1].id_value, IdValue::Text("7".to_string()));

    let body = &log.bodies("doc-search")[0];
    assert_eq!(body["ranking_variable"], "dense retrieval");
    assert_eq!(body["keywords"], "bert\\tdpr");
    assert_eq!(body["nResults"], 100);
    assert_eq!(body["requires_reranking"], true);
    assert_eq!(body["requires_additional_prefetching"], false);
}

#[tokio::test]
async fn test_fetch_content_sends_null_projection() {
    let (backend, log) = backend().await;
    let id = PaperIdentifier {
        collection: "S2ORC".to_string(),
        id_field: "id_int".to_string(),
        id_type: "int".to_string(),
        id_value: IdValue::Int(42),
    };
    let papers = backend.fetch_content(std::slice::from_ref(&id)).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].title, "BERT");
    assert_eq!(papers[0].year(), "2019");

    let body = &log.bodies("get-papers")[0];
    assert_eq!(body["projection"], Value::Null);
    assert_eq!(body["paper_list"][0]["id_value"], 42);
}

#[tokio::test]
async fn test_extract_highlights_calls_once_per_paper() {
    let (backend, log) = backend().await;
    let lists = vec![vec!["a".to_string()], vec!["b".to_string(), "c".to_string()]];
    let out = backend.extract_highlights(&lists).await.unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(log.bodies("extractive-summarize").len(), 2);
}

#[tokio::test]
async fn test_generate_citations_trims_and_replicates_query() {
    let (backend, log) = backend().await;
    let papers = vec![
        CitationPaper { title: "BERT".into(), abstract_text: "We introduce BERT.".into() },
        CitationPaper { title: "DPR".into(), abstract_text: String::new() },
    ];
    let out = backend.generate_citations(&papers, "ctx", "a;b").await.unwrap();

    assert_eq!(out, vec!["Devlin et al. proposed BERT.".to_string(), "x".to_string()]);
    let body = &log.bodies("generate-citation")[0];
    assert_eq!(body["context_list"], json!(["ctx", "ctx"]));
    assert_eq!(body["keywords_list"], json!(["a\\tb", "a\\tb"]));
    assert_eq!(body["papers"][1], json!({"Title": "DPR", "Abstract": ""}));
}

#[tokio::test]
async fn test_highlight_spans_keep_raw_keywords() {
    let (backend, log) = backend().await;
    let spans = backend.compute_highlight_spans("• BERT rocks.", "bert;rocks").await.unwrap();

    assert_eq!(spans.len(), 1);
    assert_eq!((spans[0].start, spans[0].end), (2, 6));
    let body = &log.bodies("process")[0];
    assert_eq!(body["mode"], "highlight_text_given_keywords");
    assert_eq!(body["data"]["keywords"], "bert;rocks");
}

#[tokio::test]
async fn test_highlight_full_paper_round_trips_content() {
    let (backend, log) = backend().await;
    let content = serde_json::from_value(sample_paper()).unwrap();
    let refs = vec!["• BERT rocks.".to_string()];
    let highlighted = backend.highlight_full_paper(&content, &refs).await.unwrap();

    let sentence = &highlighted.highlighted_paper.content.fullbody_parsed[0].section_text[0].paragraph_text[0];
    assert_eq!(sentence.spans.len(), 3);
    assert_eq!(sentence.spans[1].action, SpanAction::CitationMarker { ref_id: IdValue::Int(0) });

    let location = highlighted.ref_sentences_with_matched_sen_ids[0]
        .matched_sen_id_info
        .clone()
        .unwrap();
    assert_eq!(location.field_name, TextField::Fullbody);
    assert_eq!(location.sentence_id.to_string(), "0");

    // Unknown fields go back to the highlighter untouched.
    let body = &log.bodies("process")[0];
    assert_eq!(body["data"]["paper"]["_id"], "S2ORC_42");
    assert_eq!(body["data"]["ref_sentences"], json!(["• BERT rocks."]));
}

#[tokio::test]
async fn test_title_search_and_export() {
    let (backend, log) = backend().await;
    let matches = backend.title_search(&["Attention Is All You Need".to_string()]).await.unwrap();
    let id = matches[0].clone().into_identifier().unwrap();
    assert_eq!(id.id_field, "id_int");
    assert_eq!(log.bodies("title-generic-search")[0]["projection"], json!({}));

    let export = backend.export_citation(&id).await.unwrap();
    assert_eq!(export.bibtex, "@article{devlin2019}");
    assert_eq!(log.bodies("citation-formatting-service")[0]["paper_list"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_export_is_missing_response() {
    let log = Recorded::default();
    let app = Router::new().route(
        "/ml-api/citation-formatting-service/v1.0",
        replying(&log, "citation-formatting-service", json!([])),
    );
    let addr = spawn(app).await;
    let backend = HttpNlpBackend::new(&config_for(addr)).unwrap();
    let id = PaperIdentifier {
        collection: "arXiv".to_string(),
        id_field: "id_int".to_string(),
        id_type: "int".to_string(),
        id_value: IdValue::Int(1),
    };

    let err = backend.export_citation(&id).await.unwrap_err();
    assert!(matches!(err, NetworkError::MissingResponse { .. }));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let app = Router::new().route(
        "/ml-api/get-papers/v1.0",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(json!({"response": []}))
        }),
    );
    let addr = spawn(app).await;
    let mut config = config_for(addr);
    config.timeouts.get_papers_ms = 50;
    let backend = HttpNlpBackend::new(&config).unwrap();

    let err = backend.fetch_content(&[]).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "get-papers timed out after 50ms");
}

#[tokio::test]
async fn test_error_status_is_rejected() {
    let app = Router::new().route(
        "/ml-api/doc-search/v1.0",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let addr = spawn(app).await;
    let backend = HttpNlpBackend::new(&config_for(addr)).unwrap();

    let err = backend.search("q", "", 10).await.unwrap_err();
    assert!(matches!(err, NetworkError::Status { status: 500, .. }));
}
