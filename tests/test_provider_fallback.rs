//! Remote-provider behavior against a stubbed OpenAI-compatible endpoint
//!
//! A failing or nonsense endpoint must never fail a stage; agents fall
//! back to their synthetic strategies and the cycle completes.

mod test_helpers;

use agentmarket::agent::{Reasoner, StageKind};
use agentmarket::config::AgentSpec;
use agentmarket::llm::providers::{OpenAiConfig, OpenAiProvider};
use agentmarket::pipeline::Orchestrator;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{empty_orchestrator, seeded_spec};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn orchestrator_against(server: &MockServer) -> Orchestrator {
    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let reasoner = Arc::new(Reasoner::new(
        Arc::new(provider),
        "gpt-4o-mini".to_string(),
        0.2,
        256,
    ));

    let orch = empty_orchestrator();
    orch.agents()
        .create(
            &AgentSpec {
                specialty: Some("finance".to_string()),
                ..seeded_spec("discovery", "Macro Scout", 21)
            },
            reasoner,
        )
        .unwrap();
    orch
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-4o-mini",
        "choices": [{ "message": { "content": content } }],
        "usage": { "prompt_tokens": 40, "completion_tokens": 30, "total_tokens": 70 }
    })
}

#[tokio::test]
async fn test_http_error_falls_back_to_synthetic_decision() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let orch = orchestrator_against(&server).await;
    let report = orch.run_stage(StageKind::Discovery).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(orch.events().pending_events().len(), 1);
    // The synthetic strategy stays inside the agent's specialty.
    assert_eq!(orch.events().pending_events()[0].category, "finance");
}

#[tokio::test]
async fn test_unparsable_reply_falls_back_to_synthetic_decision() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("I could not find anything interesting today.")),
        )
        .mount(&server)
        .await;

    let orch = orchestrator_against(&server).await;
    let report = orch.run_stage(StageKind::Discovery).await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(orch.events().pending_events().len(), 1);
}

#[tokio::test]
async fn test_well_formed_reply_drives_the_decision() {
    let reply = r#"Here is my analysis:
```json
{
  "event_title": "Central bank cuts rates in September",
  "category": "finance",
  "confidence": 0.9,
  "market_potential": "high",
  "recommended_topics": ["rates"],
  "description": "futures imply a cut",
  "sources": ["futures curve"]
}
```"#;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(reply)))
        .mount(&server)
        .await;

    let orch = orchestrator_against(&server).await;
    let report = orch.run_stage(StageKind::Discovery).await;

    assert_eq!(report.succeeded, 1);
    let events = orch.events().pending_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Central bank cuts rates in September");
    assert_eq!(events[0].sources, vec!["futures curve".to_string()]);
}
