// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport tests against a wiremock endpoint.

use futures::StreamExt;
use rivulet_config::model::EndpointConfig;
use rivulet_core::{
    ChatRequest, ChatTransport, Frame, HealthStatus, Role, RivuletError, WireMessage,
};
use rivulet_transport::HttpTransport;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> HttpTransport {
    let endpoint = EndpointConfig {
        base_url: server.uri(),
        ..EndpointConfig::default()
    };
    HttpTransport::new(&endpoint).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "m1".into(),
        messages: vec![WireMessage {
            role: Role::User,
            content: "Hello".into(),
        }],
        max_tokens: 128,
        temperature: None,
        system: None,
        stream: true,
    }
}

#[tokio::test]
async fn streams_frames_from_ndjson_body() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"token\":\"He\",\"done\":false}\n",
        "garbage line\n",
        "{\"token\":\"llo\",\"done\":false}\n",
        "{\"token\":\"\",\"done\":true,\"model\":\"m1\",\"total_tokens\":5}\n",
    );

    Mock::given(method("POST"))
        .and(path("/api/claude/chat/stream"))
        .and(body_partial_json(json!({
            "model": "m1",
            "maxTokens": 128,
            "stream": true,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let frames: Vec<Frame> = transport
        .open_stream(&request())
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(
        frames,
        vec![
            Frame::token("He"),
            Frame::token("llo"),
            Frame::terminal(Some("m1".into()), Some(5)),
        ]
    );
}

#[tokio::test]
async fn non_success_status_is_an_open_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/claude/chat/stream"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "ANTHROPIC_API_KEY not configured"})),
        )
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let Err(err) = transport.open_stream(&request()).await else {
        panic!("expected open failure");
    };
    match err {
        RivuletError::TransportOpen { status, message } => {
            assert_eq!(status, Some(400));
            assert!(message.contains("ANTHROPIC_API_KEY not configured"));
        }
        other => panic!("expected TransportOpen, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_an_open_failure() {
    let endpoint = EndpointConfig {
        base_url: "http://127.0.0.1:1".into(),
        connect_timeout_secs: 1,
        ..EndpointConfig::default()
    };
    let transport = HttpTransport::new(&endpoint).unwrap();
    let Err(err) = transport.open_stream(&request()).await else {
        panic!("expected open failure");
    };
    assert!(matches!(err, RivuletError::TransportOpen { status: None, .. }));
}

#[tokio::test]
async fn health_check_reports_available_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "version": "4.0.0",
            "app": "backend",
            "uptime_seconds": 3,
            "providers": [
                {"name": "anthropic", "available": true},
                {"name": "google", "available": false}
            ]
        })))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    assert_eq!(transport.health_check().await.unwrap(), HealthStatus::Healthy);
    let health = transport.health().await.unwrap();
    assert_eq!(health.version, "4.0.0");
}

#[tokio::test]
async fn health_check_is_degraded_without_providers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "version": "4.0.0",
            "app": "backend",
            "uptime_seconds": 3,
            "providers": [{"name": "anthropic", "available": false}]
        })))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    assert!(matches!(
        transport.health_check().await.unwrap(),
        HealthStatus::Degraded(_)
    ));
}

#[tokio::test]
async fn health_check_is_unhealthy_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    match transport.health_check().await.unwrap() {
        HealthStatus::Unhealthy(reason) => assert!(reason.contains("500")),
        other => panic!("expected Unhealthy, got {other:?}"),
    }
}

#[tokio::test]
async fn models_lists_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/claude/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m1", "name": "Model One", "tier": "Commander", "provider": "anthropic", "available": true},
            {"id": "m2", "name": "Model Two", "tier": "Executor", "provider": "anthropic", "available": false}
        ])))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let models = transport.models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "m1");
    assert!(!models[1].available);
}

#[tokio::test]
async fn malformed_catalog_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/claude/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    assert!(matches!(
        transport.models().await,
        Err(RivuletError::Decode { .. })
    ));
}
