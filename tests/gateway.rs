use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use singlish_chat::{
    ChatBackend, ChatRole, GatewayError, HistoryEntry, HttpGateway, Persona, Safety, SendFailure,
};

async fn gateway_for(server: &MockServer) -> HttpGateway {
    HttpGateway::new(&format!("{}/api", server.uri())).unwrap()
}

#[tokio::test]
async fn test_chat_request_and_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "message": "Eh, makan already?",
            "conversation_history": [
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Wah hello!"}
            ],
            "persona": "xmm"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Not yet leh, you belanja?",
            "safety": "Safe",
            "timestamp": "2024-05-01T12:30:00.123456"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![
        HistoryEntry {
            role: ChatRole::User,
            content: "Hello".into(),
        },
        HistoryEntry {
            role: ChatRole::Assistant,
            content: "Wah hello!".into(),
        },
    ];

    let gateway = gateway_for(&server).await;
    let reply = gateway
        .send_chat_message("Eh, makan already?", &history, Persona::Xmm)
        .await
        .unwrap();

    assert_eq!(reply.response, "Not yet leh, you belanja?");
    assert_eq!(reply.safety, Some(Safety::Safe));
    assert_eq!(reply.timestamp.as_deref(), Some("2024-05-01T12:30:00.123456"));
}

#[tokio::test]
async fn test_chat_reply_without_optional_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"persona": "nsf"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Roger sir"})))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let reply = gateway
        .send_chat_message("Report!", &[], Persona::Nsf)
        .await
        .unwrap();

    assert_eq!(reply.response, "Roger sir");
    assert_eq!(reply.safety, None);
    assert_eq!(reply.timestamp, None);
}

#[tokio::test]
async fn test_unrecognised_safety_label_keeps_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Can lah",
            "safety": "Unknown",
            "timestamp": "2024-05-01T12:30:00.123456"
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let reply = gateway
        .send_chat_message("Can or not?", &[], Persona::Singlish)
        .await
        .unwrap();

    assert_eq!(reply.response, "Can lah");
    assert_eq!(reply.safety, Some(Safety::Unknown));
}

#[tokio::test]
async fn test_server_error_message_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "Model is still loading"})),
        )
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .send_chat_message("Hello", &[], Persona::Singlish)
        .await
        .unwrap_err();

    match &err {
        GatewayError::Server { status, message } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message.as_deref(), Some("Model is still loading"));
        }
        other => panic!("expected server error, got {:?}", other),
    }
    assert_eq!(
        SendFailure::classify(&err).to_string(),
        "Model is still loading"
    );
}

#[tokio::test]
async fn test_server_error_without_message_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .send_chat_message("Hello", &[], Persona::Singlish)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Server { message: None, .. }));
    assert_eq!(
        SendFailure::classify(&err).to_string(),
        "Sorry, something went wrong. Please try again."
    );
}

#[tokio::test]
async fn test_malformed_reply_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let err = gateway
        .send_chat_message("Hello", &[], Persona::Singlish)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "too late"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let gateway =
        HttpGateway::with_timeout(&format!("{}/api", server.uri()), Duration::from_millis(200))
            .unwrap();
    let err = gateway
        .send_chat_message("Hello", &[], Persona::Singlish)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Timeout));
    assert_eq!(
        SendFailure::classify(&err).to_string(),
        "Request timeout. The server might be busy, please try again."
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let gateway = HttpGateway::new("http://127.0.0.1:1/api").unwrap();
    let err = gateway.health_check().await.unwrap_err();

    assert!(matches!(err, GatewayError::Network(_)));
    assert_eq!(
        SendFailure::classify(&err).to_string(),
        "Network error. Please check your connection and try again."
    );
}

#[tokio::test]
async fn test_health_check_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    assert!(gateway.health_check().await.is_ok());
    assert!(matches!(
        gateway.health_check().await,
        Err(GatewayError::Server { .. })
    ));
}

#[tokio::test]
async fn test_model_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/model-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "loaded",
            "model": {"name": "sealion-7b", "device": "cpu"}
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server).await;
    let status = gateway.model_status().await.unwrap();

    assert_eq!(status.status, "loaded");
    assert_eq!(status.model["name"], "sealion-7b");
}
