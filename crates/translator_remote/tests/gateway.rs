use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use translator_remote::{
    Gateway, GatewayErrorKind, GatewaySettings, Language, Operation, RemoteStatus,
    ReqwestGateway, TranslateRequest,
};
use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> ReqwestGateway {
    ReqwestGateway::new(GatewaySettings {
        api_base: server.uri(),
        ..GatewaySettings::default()
    })
    .expect("gateway")
}

#[tokio::test]
async fn engine_status_and_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ollama/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "installed": true,
            "running": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ollama/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let status = gateway.engine_status().await.expect("status");
    assert!(status.installed);
    assert!(!status.running);
    assert!(gateway.request_engine_start().await.expect("start").success);
}

#[tokio::test]
async fn engine_start_failure_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ollama/start"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Ollama is not installed"})),
        )
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .request_engine_start()
        .await
        .unwrap_err();
    assert_eq!(err.operation, Operation::EngineStart);
    assert_eq!(err.kind, GatewayErrorKind::Remote { status: 400 });
    assert_eq!(err.message, "Ollama is not installed");
}

#[tokio::test]
async fn lists_models_and_languages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"models": ["llama3:8b", "qwen2:7b"]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/languages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "languages": [{"code": "en", "name": "English"}, {"code": "ko", "name": "Korean"}]
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    assert_eq!(
        gateway.list_models().await.unwrap(),
        vec!["llama3:8b".to_string(), "qwen2:7b".to_string()]
    );
    assert_eq!(
        gateway.list_languages().await.unwrap(),
        vec![
            Language {
                code: "en".to_string(),
                name: "English".to_string()
            },
            Language {
                code: "ko".to_string(),
                name: "Korean".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn upload_sends_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(header_exists("content-type"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"book.epub\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "f1",
            "filename": "book.epub",
            "file_size": 5,
            "chapter_count": 12
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uploaded = gateway_for(&server)
        .upload_file(b"hello".to_vec(), "book.epub")
        .await
        .expect("upload");
    assert_eq!(uploaded.file_id, "f1");
    assert_eq!(uploaded.chapter_count, 12);
    assert_eq!(uploaded.file_size, 5);
}

#[tokio::test]
async fn upload_failure_uses_detail_or_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .upload_file(b"x".to_vec(), "notes.txt")
        .await
        .unwrap_err();
    assert_eq!(err.operation, Operation::Upload);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message, "Upload failed");
}

#[tokio::test]
async fn start_job_posts_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .and(body_json(json!({
            "file_id": "f1",
            "source_language": "en",
            "target_language": "ko",
            "model": "m1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "j1"})))
        .expect(1)
        .mount(&server)
        .await;

    let started = gateway_for(&server)
        .start_job(&TranslateRequest {
            file_id: "f1".to_string(),
            source_language: "en".to_string(),
            target_language: "ko".to_string(),
            model: "m1".to_string(),
        })
        .await
        .expect("start");
    assert_eq!(started.job_id, "j1");
}

#[tokio::test]
async fn start_job_for_unknown_file_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "File not found"})))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .start_job(&TranslateRequest {
            file_id: "missing".to_string(),
            source_language: "en".to_string(),
            target_language: "ko".to_string(),
            model: "m1".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.operation, Operation::StartJob);
    assert_eq!(err.kind, GatewayErrorKind::Remote { status: 404 });
    assert_eq!(err.message, "File not found");
}

#[tokio::test]
async fn cancel_job_issues_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/job/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Job not found or already completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gateway_for(&server).cancel_job("j1").await.expect("cancel");
    assert!(!reply.success);
    assert_eq!(
        reply.message.as_deref(),
        Some("Job not found or already completed")
    );
}

#[tokio::test]
async fn job_status_decodes_service_schema() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "j1",
            "status": "completed",
            "current_chapter": 12,
            "total_chapters": 12,
            "current_chunk": 4,
            "total_chunks": 4,
            "percentage": 0.0,
            "error_message": null,
            "download_url": "/api/download/j1"
        })))
        .mount(&server)
        .await;

    let status = gateway_for(&server).job_status("j1").await.expect("status");
    assert_eq!(status.status, RemoteStatus::Completed);
    assert_eq!(status.download_url.as_deref(), Some("/api/download/j1"));
}

#[tokio::test]
async fn download_returns_bytes_and_respects_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/download/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("EPUBDATA", "application/epub+zip"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    assert_eq!(
        gateway.download("/api/download/j1").await.unwrap(),
        b"EPUBDATA".to_vec()
    );
    assert_eq!(
        gateway
            .download(&gateway.download_url("j1"))
            .await
            .unwrap(),
        b"EPUBDATA".to_vec()
    );

    let limited = ReqwestGateway::new(GatewaySettings {
        api_base: server.uri(),
        max_download_bytes: 4,
        ..GatewaySettings::default()
    })
    .unwrap();
    let err = limited.download("/api/download/j1").await.unwrap_err();
    assert_eq!(err.kind, GatewayErrorKind::InvalidResponse);
}

#[tokio::test]
async fn download_path_stays_under_prefixed_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/svc/api/download/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("EPUB", "application/epub+zip"))
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new(GatewaySettings {
        api_base: format!("{}/svc/", server.uri()),
        ..GatewaySettings::default()
    })
    .unwrap();
    assert_eq!(
        gateway.download("/api/download/j1").await.unwrap(),
        b"EPUB".to_vec()
    );
    assert_eq!(
        gateway
            .download(&gateway.download_url("j1"))
            .await
            .unwrap(),
        b"EPUB".to_vec()
    );
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"models": []})),
        )
        .mount(&server)
        .await;

    let gateway = ReqwestGateway::new(GatewaySettings {
        api_base: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..GatewaySettings::default()
    })
    .unwrap();
    let err = gateway.list_models().await.unwrap_err();
    assert_eq!(err.kind, GatewayErrorKind::Timeout);
}

#[tokio::test]
async fn download_url_is_pure_construction() {
    let gateway = ReqwestGateway::new(GatewaySettings::default()).unwrap();
    assert_eq!(
        gateway.download_url("j1"),
        "http://localhost:8000/api/download/j1"
    );
}
