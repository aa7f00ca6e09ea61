//! Integration tests for the discover → research → script workflow
//!
//! These tests drive the real OpenRouter client and HTTP link checker against a
//! local mock server, with the research store in a temporary directory.

use serde_json::json;
use std::fs;
use std::time::Duration;
use storyline_lib::gateway::FailureKind;
use storyline_lib::topics::extract_titles;
use storyline_lib::{
    FieldSelection, FlowError, HttpLinkChecker, LinkAnnotator, OpenRouterGateway,
    ResearchOutcome, ResultStore, SessionState, Workflow, WorkflowError,
};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DISCOVERY_MODEL: &str = "perplexity/sonar-pro";
const RESEARCH_MODEL: &str = "perplexity/sonar-deep-research";
const SCRIPT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Helper to build a chat completion body with the given content
fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

/// Helper to mount a successful completion for one model
async fn mount_model(server: &MockServer, model: &str, content: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": model })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Helper to build a workflow pointed at the mock server
fn workflow(
    server: &MockServer,
    store_path: &std::path::Path,
) -> Workflow<OpenRouterGateway, HttpLinkChecker> {
    let gateway = OpenRouterGateway::new("sk-test").with_base_url(server.uri());
    let checker = HttpLinkChecker::with_timeout(Duration::from_secs(2)).unwrap();
    Workflow::new(gateway, ResultStore::new(store_path), LinkAnnotator::new(checker))
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_full_pipeline() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("research_results.json");

    let discovery = format!(
        "### **YouTube video topic strategy list**\n\n\
         #### Why chip exports matter now\n\
         - Sources: {uri}/ok and {uri}/gone\n",
        uri = server.uri()
    );
    mount_model(&server, DISCOVERY_MODEL, &discovery, 1).await;
    mount_model(&server, RESEARCH_MODEL, "## Executive summary\nExports fell.", 1).await;
    mount_model(&server, SCRIPT_MODEL, "Picture this...", 1).await;

    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let wf = workflow(&server, &store_path);
    let mut state = SessionState::new();

    let annotated = wf
        .discover(&mut state, &FieldSelection::Semiconductors)
        .await
        .unwrap();
    assert!(annotated.contains(&format!("{}/ok ✅", server.uri())));
    assert!(annotated.contains(&format!("{}/gone ❌", server.uri())));

    let titles = extract_titles(&state.discovered_topics_text);
    assert_eq!(titles, vec!["Why chip exports matter now".to_string()]);

    let outcome = wf.research(&mut state, &titles[0]).await.unwrap();
    assert!(matches!(outcome, ResearchOutcome::Fresh(_)));

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&store_path).unwrap()).unwrap();
    assert_eq!(
        raw,
        json!({
            "Why chip exports matter now": {
                "perplexity_result": "## Executive summary\nExports fell."
            }
        })
    );

    let script = wf.script(&state, &titles[0]).await.unwrap();
    assert_eq!(script, "Picture this...");
}

#[tokio::test]
async fn test_failed_research_writes_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("research_results.json");

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": {"message": "upstream exploded", "code": 500}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wf = workflow(&server, &store_path);
    let mut state = SessionState::new();

    let err = wf.research(&mut state, "X").await.unwrap_err();
    match err {
        WorkflowError::Flow(FlowError::Gateway(e)) => {
            assert_eq!(e.kind(), FailureKind::ServiceError)
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(!store_path.exists());
    assert!(wf.store().get("X").is_none());
    assert!(state.research_results.is_empty());
}

#[tokio::test]
async fn test_cached_research_skips_model() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("research_results.json");
    fs::write(
        &store_path,
        r#"{"Fed cuts": {"perplexity_result": "cached report"}}"#,
    )
    .unwrap();

    mount_model(&server, RESEARCH_MODEL, "fresh report", 0).await;

    let wf = workflow(&server, &store_path);
    let mut state = SessionState::new();

    let outcome = wf.research(&mut state, "Fed cuts").await.unwrap();
    assert_eq!(outcome, ResearchOutcome::Cached("cached report".to_string()));
    assert_eq!(
        state.research_results.get("Fed cuts").map(String::as_str),
        Some("cached report")
    );
    assert_eq!(state.selected_topic.as_deref(), Some("Fed cuts"));
}

#[tokio::test]
async fn test_script_without_research_makes_no_call() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let wf = workflow(&server, &dir.path().join("research_results.json"));
    let state = SessionState::new();

    let err = wf.script(&state, "Never researched").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NoResearch(topic) if topic == "Never researched"));
}

#[tokio::test]
async fn test_failed_discovery_keeps_previous_topics() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "Rate limit exceeded", "code": 429}})),
        )
        .mount(&server)
        .await;

    let wf = workflow(&server, &dir.path().join("research_results.json"));
    let mut state = SessionState::new();
    state.discovered_topics_text = "#### Earlier topic".to_string();

    let err = wf
        .discover(&mut state, &FieldSelection::Auto)
        .await
        .unwrap_err();
    match err {
        WorkflowError::Flow(FlowError::Gateway(e)) => {
            assert_eq!(e.kind(), FailureKind::RateLimited)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(state.discovered_topics_text, "#### Earlier topic");
}

#[tokio::test]
async fn test_research_survives_corrupt_store() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("research_results.json");
    fs::write(&store_path, "{ not json").unwrap();

    mount_model(&server, RESEARCH_MODEL, "new report", 1).await;

    let wf = workflow(&server, &store_path);
    let mut state = SessionState::new();

    let outcome = wf.research(&mut state, "Oil prices").await.unwrap();
    assert_eq!(outcome, ResearchOutcome::Fresh("new report".to_string()));
    assert_eq!(wf.store().topics(), vec!["Oil prices".to_string()]);
}

#[tokio::test]
async fn test_unsaved_research_hands_back_report() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("isdir");
    fs::create_dir(&store_path).unwrap();

    mount_model(&server, RESEARCH_MODEL, "EXPENSIVE REPORT", 1).await;

    let wf = workflow(&server, &store_path);
    let mut state = SessionState::new();

    let err = wf.research(&mut state, "Chip tariffs").await.unwrap_err();
    assert!(err.to_string().starts_with("Research finished but could not be saved"));
    match err {
        WorkflowError::Unsaved { report, .. } => assert_eq!(report, "EXPENSIVE REPORT"),
        other => panic!("unexpected error: {other:?}"),
    }

    // The report is still usable for a script in the same session.
    assert_eq!(
        wf.research_report(&state, "Chip tariffs").as_deref(),
        Some("EXPENSIVE REPORT")
    );
}
