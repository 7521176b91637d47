use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::sync::Arc;

use logsense::models::{NewMessage, Role, Sentiment};
use logsense::pipeline::{
    BatchOutcome, ClassifierError, HttpClassifier, RetryPolicy, SentimentClassifier, SentimentClient,
};
use logsense::rag::{AssistantError, HttpAssistant, SolutionAssistant};

fn sentences() -> Vec<String> {
    vec!["ERROR pump stalled".to_string(), "INFO pump idle".to_string()]
}

#[tokio::test]
async fn classifier_posts_sentences_and_reads_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze_batch"))
        .and(body_json(json!({ "log_sentences": ["ERROR pump stalled", "INFO pump idle"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "sentiment": -1, "explanation": "stall" },
                { "sentiment": 0 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let classifier =
        HttpClassifier::new(format!("{}/analyze_batch", server.uri()), Duration::from_secs(5)).unwrap();
    let verdicts = classifier.classify(&sentences()).await.unwrap();

    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].sentiment, Some(-1.0));
    assert_eq!(verdicts[0].explanation.as_deref(), Some("stall"));
    assert_eq!(verdicts[1].sentiment, Some(0.0));
    assert_eq!(verdicts[1].explanation, None);
}

#[tokio::test]
async fn non_numeric_sentiment_only_affects_its_own_log() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "sentiment": -1 },
                { "sentiment": "neutral" },
                { "sentiment": -1, "explanation": { "tokens": 3 } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let classifier = HttpClassifier::new(server.uri(), Duration::from_secs(5)).unwrap();
    let client = SentimentClient::new(Arc::new(classifier), RetryPolicy::default());
    let batch = vec![
        (1, "ERROR pump stalled".to_string()),
        (2, "INFO pump idle".to_string()),
        (3, "ERROR valve jammed".to_string()),
    ];

    let verdict = client.classify_batch(&batch).await;

    assert_eq!(verdict.outcome, BatchOutcome::Classified { attempts: 1 });
    assert_eq!(
        verdict.sentiments,
        vec![
            (1, Sentiment::Flagged),
            (2, Sentiment::NotFlagged),
            (3, Sentiment::Flagged),
        ]
    );
}

#[tokio::test]
async fn classifier_without_results_field_yields_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let classifier = HttpClassifier::new(server.uri(), Duration::from_secs(5)).unwrap();
    assert!(classifier.classify(&sentences()).await.unwrap().is_empty());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let classifier = HttpClassifier::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = classifier.classify(&sentences()).await.unwrap_err();

    assert!(err.is_retryable());
    match err {
        ClassifierError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model not loaded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let classifier = HttpClassifier::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = classifier.classify(&sentences()).await.unwrap_err();

    assert!(matches!(err, ClassifierError::Decode(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn assistant_query_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "conversation_id": "7", "query": "why?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "replace the fuse" })))
        .expect(1)
        .mount(&server)
        .await;

    let assistant = HttpAssistant::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    let answer = assistant.query("7", "why?").await.unwrap();

    assert_eq!(answer, "replace the fuse");
}

#[tokio::test]
async fn assistant_preload_sends_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/preload-history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let assistant = HttpAssistant::new(server.uri(), Duration::from_secs(5)).unwrap();
    let history = vec![NewMessage {
        sent_date: chrono::Utc::now(),
        role: Role::User,
        content: "the pump stalled".into(),
    }];
    assistant.preload_history("3", &history).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["conversation_id"], "3");
    assert_eq!(body["messages"][0]["Role"], 1);
    assert_eq!(body["messages"][0]["Content"], "the pump stalled");
}

#[tokio::test]
async fn assistant_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let assistant = HttpAssistant::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = assistant.query("1", "hello").await.unwrap_err();

    assert!(matches!(err, AssistantError::Status { status: 502, .. }));
}
