//! End-to-end route tests against a live listener with a fake client layer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{net::SocketAddr, sync::Arc};

use {
    serde_json::{Value, json},
    tokio::net::TcpListener,
};

use {
    wamux_client::{ClientFactory, RawSendResult, testing::FakeFactory},
    wamux_gateway::server::{AppState, build_router, build_state},
    wamux_sessions::{NewSession, StatusChange, memory_pool},
};

struct TestServer {
    addr: SocketAddr,
    factory: Arc<FakeFactory>,
    state: AppState,
    http: reqwest::Client,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Create a session through the controller and force it ready, the
    /// state a session reaches after the QR handshake completes.
    async fn ready_session(&self, id: &str, phone: &str) {
        self.state
            .controller
            .create(NewSession {
                id: id.into(),
                name: format!("{id} name"),
                description: None,
            })
            .await
            .unwrap();
        self.state
            .store
            .apply(
                id,
                StatusChange::Ready {
                    phone: Some(phone.into()),
                },
            )
            .await
            .unwrap();
    }
}

async fn start_server() -> TestServer {
    let factory = Arc::new(FakeFactory::new());
    let pool = memory_pool().await.unwrap();
    let state = build_state(
        pool,
        Arc::clone(&factory) as Arc<dyn ClientFactory>,
        "91",
    )
    .await
    .unwrap();

    let app = build_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        factory,
        state,
        http: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn health_reports_session_totals() {
    let server = start_server().await;
    server.ready_session("main", "911234567890").await;

    let body: Value = server
        .http
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "wamux");
    assert_eq!(body["totalSessions"], 1);
    assert_eq!(body["readySessions"], 1);
}

#[tokio::test]
async fn create_then_get_session() {
    let server = start_server().await;

    let res = server
        .http
        .post(server.url("/api/sessions"))
        .json(&json!({ "id": "alpha", "name": "Alpha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["session"]["id"], "alpha");
    assert_eq!(body["session"]["status"], "initializing");

    let res = server
        .http
        .get(server.url("/api/sessions/alpha"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["session"]["id"], "alpha");
    assert_eq!(body["hasQr"], false);
}

#[tokio::test]
async fn create_rejects_missing_fields_and_duplicates() {
    let server = start_server().await;

    let res = server
        .http
        .post(server.url("/api/sessions"))
        .json(&json!({ "id": "nameless" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    for expected in [200, 409] {
        let res = server
            .http
            .post(server.url("/api/sessions"))
            .json(&json!({ "id": "twice", "name": "Twice" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), expected);
    }
    let body: Value = server
        .http
        .get(server.url("/api/sessions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn bulk_create_isolates_bad_entries() {
    let server = start_server().await;
    server.ready_session("taken", "911111111111").await;

    let res = server
        .http
        .post(server.url("/api/sessions/bulk"))
        .json(&json!([
            { "id": "one", "name": "One" },
            { "id": "taken", "name": "Clash" },
            { "name": "No id" },
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["ok"], true);
    assert_eq!(results[1]["ok"], false);
    assert_eq!(results[2]["ok"], false);
}

#[tokio::test]
async fn bulk_create_rejects_empty_list() {
    let server = start_server().await;
    let res = server
        .http
        .post(server.url("/api/sessions/bulk"))
        .json(&json!([]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn unknown_session_is_404() {
    let server = start_server().await;
    for (method, path) in [
        ("GET", "/api/sessions/ghost"),
        ("DELETE", "/api/sessions/ghost"),
        ("GET", "/api/sessions/ghost/qr"),
        ("POST", "/api/sessions/ghost/logout"),
    ] {
        let req = match method {
            "GET" => server.http.get(server.url(path)),
            "DELETE" => server.http.delete(server.url(path)),
            _ => server.http.post(server.url(path)),
        };
        let res = req.send().await.unwrap();
        assert_eq!(res.status(), 404, "{method} {path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["ok"], false);
    }
}

#[tokio::test]
async fn remove_session_deletes_record() {
    let server = start_server().await;
    server.ready_session("gone", "911111111111").await;

    let res = server
        .http
        .delete(server.url("/api/sessions/gone"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(server.state.store.get("gone").await.unwrap().is_none());
}

#[tokio::test]
async fn qr_route_signals_without_erroring() {
    let server = start_server().await;
    server
        .state
        .controller
        .create(NewSession {
            id: "pending".into(),
            name: "Pending".into(),
            description: None,
        })
        .await
        .unwrap();

    let body: Value = server
        .http
        .get(server.url("/api/sessions/pending/qr"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "not_available");

    server.ready_session("done", "911111111111").await;
    let body: Value = server
        .http
        .get(server.url("/api/sessions/done/qr"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "already_authenticated");
}

#[tokio::test]
async fn send_message_round_trip() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;
    let client = server.factory.client("sender").unwrap();
    client.push_send_result(RawSendResult::Plain { id: "MSG-1".into() });

    let res = server
        .http
        .post(server.url("/api/send"))
        .json(&json!({ "to": "9876543210", "message": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["messageId"], "MSG-1");
    assert_eq!(body["sessionId"], "sender");
    assert_eq!(body["to"], "919876543210");

    let calls = client.sent_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].chat_id, "919876543210@c.us");
}

#[tokio::test]
async fn send_without_ready_sessions_is_503() {
    let server = start_server().await;
    let res = server
        .http
        .post(server.url("/api/send"))
        .json(&json!({ "to": "9876543210", "message": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
}

#[tokio::test]
async fn send_with_missing_fields_is_400() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;
    let res = server
        .http
        .post(server.url("/api/send"))
        .json(&json!({ "to": "9876543210" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn send_to_unregistered_number_is_400() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;
    server.factory.client("sender").unwrap().allow_only(&[]);

    let res = server
        .http
        .post(server.url("/api/send"))
        .json(&json!({ "to": "9876543210", "message": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn send_failure_maps_to_500_and_is_audited() {
    let server = start_server().await;
    server.ready_session("flaky", "911234567890").await;
    server.factory.client("flaky").unwrap().fail_sends(true);

    let res = server
        .http
        .post(server.url("/api/send"))
        .json(&json!({ "to": "9876543210", "message": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    let body: Value = server
        .http
        .get(server.url("/api/messages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["status"], "failed");
}

#[tokio::test]
async fn send_media_multipart_round_trip() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;

    let form = reqwest::multipart::Form::new()
        .text("to", "9876543210")
        .text("caption", "the chart")
        .part(
            "media",
            reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .file_name("chart.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let res = server
        .http
        .post(server.url("/api/send-media"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["mediaType"], "image/png");
    assert_eq!(body["fileName"], "chart.png");
    assert_eq!(body["caption"], "the chart");

    let calls = server.factory.client("sender").unwrap().sent_calls();
    assert_eq!(calls[0].mime_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn send_media_rejects_unsupported_type() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;

    let form = reqwest::multipart::Form::new().text("to", "9876543210").part(
        "media",
        reqwest::multipart::Part::bytes(vec![0x4d, 0x5a])
            .file_name("tool.exe")
            .mime_str("application/x-msdownload")
            .unwrap(),
    );
    let res = server
        .http
        .post(server.url("/api/send-media"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 415);
    // Validation failed before any session work.
    assert!(server.factory.client("sender").unwrap().sent_calls().is_empty());
}

#[tokio::test]
async fn oversized_media_body_is_413() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;

    let form = reqwest::multipart::Form::new().text("to", "9876543210").part(
        "media",
        reqwest::multipart::Part::bytes(vec![
            0u8;
            wamux_sessions::media::MAX_MEDIA_BYTES + 2 * 1024 * 1024
        ])
        .file_name("huge.png")
        .mime_str("image/png")
        .unwrap(),
    );
    let res = server
        .http
        .post(server.url("/api/send-media"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);
}

#[tokio::test]
async fn send_media_url_accepts_a_data_uri() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;

    // base64 of the PNG magic bytes.
    let res = server
        .http
        .post(server.url("/api/send-media-url"))
        .json(&json!({
            "to": "9876543210",
            "mediaUrl": "data:image/png;base64,iVBORw0KGgo=",
            "mediaType": "image/png",
            "caption": "logo",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["mediaSource"], "base64");
    assert_eq!(body["mediaType"], "image/png");
    assert_eq!(body["caption"], "logo");
    assert!(
        body["messageId"]
            .as_str()
            .unwrap()
            .starts_with("media_url_")
    );

    let calls = server.factory.client("sender").unwrap().sent_calls();
    assert_eq!(calls[0].mime_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn send_media_url_fetches_remote_payloads() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;

    let file_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let file_addr = file_listener.local_addr().unwrap();
    let files = axum::Router::new().route(
        "/payload",
        axum::routing::get(|| async { vec![0x25, 0x50, 0x44, 0x46] }),
    );
    tokio::spawn(async move {
        axum::serve(file_listener, files).await.unwrap();
    });

    let res = server
        .http
        .post(server.url("/api/send-media-url"))
        .json(&json!({
            "to": "9876543210",
            "mediaUrl": format!("http://{file_addr}/payload"),
            "mediaType": "application/pdf",
            "filename": "report.pdf",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["mediaSource"], "url");
    assert_eq!(body["fileName"], "report.pdf");

    // A caller-supplied name is dropped for non-document types.
    let res = server
        .http
        .post(server.url("/api/send-media-url"))
        .json(&json!({
            "to": "9876543210",
            "mediaUrl": format!("http://{file_addr}/payload"),
            "mediaType": "image/png",
            "filename": "snap.png",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["mediaSource"], "url");
    assert!(body.get("fileName").is_none());
}

#[tokio::test]
async fn send_media_url_rejects_bad_input() {
    let server = start_server().await;
    server.ready_session("sender", "911234567890").await;

    // Missing mediaType.
    let res = server
        .http
        .post(server.url("/api/send-media-url"))
        .json(&json!({ "to": "9876543210", "mediaUrl": "http://127.0.0.1:1/x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    // A dead remote is the caller's problem.
    let unreachable = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let res = server
        .http
        .post(server.url("/api/send-media-url"))
        .json(&json!({
            "to": "9876543210",
            "mediaUrl": format!("http://{unreachable}/gone"),
            "mediaType": "image/png",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    // Garbage in the data URI payload.
    let res = server
        .http
        .post(server.url("/api/send-media-url"))
        .json(&json!({
            "to": "9876543210",
            "mediaUrl": "data:image/png;base64,@@not-base64@@",
            "mediaType": "image/png",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    assert!(server.factory.client("sender").unwrap().sent_calls().is_empty());
}

#[tokio::test]
async fn auto_generate_skips_existing_ids() {
    let server = start_server().await;
    server.ready_session("auto2", "911111111111").await;

    let res = server
        .http
        .post(server.url("/api/sessions/auto-generate"))
        .json(&json!({ "count": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["sessions"], json!(["auto1", "auto3"]));
    assert_eq!(body["totalSessions"], 3);
}

#[tokio::test]
async fn auto_generate_validates_count() {
    let server = start_server().await;
    for count in [0, 101] {
        let res = server
            .http
            .post(server.url("/api/sessions/auto-generate"))
            .json(&json!({ "count": count }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400, "count {count}");
    }
    assert!(server.state.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn send_media_without_file_is_400() {
    let server = start_server().await;
    let form = reqwest::multipart::Form::new().text("to", "9876543210");
    let res = server
        .http
        .post(server.url("/api/send-media"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn media_types_lists_capabilities() {
    let server = start_server().await;
    let body: Value = server
        .http
        .get(server.url("/api/media-types"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let supported = &body["capabilities"]["supportedTypes"];
    assert!(
        supported["images"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t == "image/png")
    );
}

#[tokio::test]
async fn messages_filter_by_session() {
    let server = start_server().await;
    server.ready_session("a", "911111111111").await;
    server.ready_session("b", "912222222222").await;

    for session in ["a", "b", "a"] {
        let res = server
            .http
            .post(server.url("/api/send"))
            .json(&json!({ "to": "9876543210", "message": "x", "sessionId": session }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    let body: Value = server
        .http
        .get(server.url("/api/messages?sessionId=a"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn reconnect_reports_active_state() {
    let server = start_server().await;
    server.ready_session("up", "911111111111").await;
    server.factory.client("up").unwrap().set_connected(true);

    let body: Value = server
        .http
        .post(server.url("/api/sessions/up/reconnect"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], "already_active");
}
