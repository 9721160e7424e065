// rest_api/tests/api.rs

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use lib::config::AppConfig;
use rest_api::AppState;

const ADMIN_EMAIL: &str = "admin@clinic.org";
const ADMIN_PASSWORD: &str = "admin-pass-123";

struct TestServer {
    base: String,
    client: Client,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(AppConfig::default()).await
    }

    async fn start_with(config: AppConfig) -> Self {
        let state = AppState::in_memory(config);
        state.users.ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        tokio::spawn(rest_api::serve(listener, state, async move {
            let _ = rx.await;
        }));
        TestServer {
            base: format!("http://{}/api/v1", addr),
            client: Client::new(),
            _shutdown: shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let body = self
            .post_json("/auth/login", None, json!({ "email": email, "password": password }))
            .await;
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn patient_token(&self, email: &str) -> String {
        let resp = self
            .send("POST", "/auth/register", None, Some(json!({
                "email": email,
                "display_name": "Test Patient",
                "password": "patient-pass-1",
            })))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        self.login(email, "patient-pass-1").await
    }

    async fn send(&self, method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap();
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    async fn get_json(&self, path: &str, token: Option<&str>) -> Value {
        let resp = self.send("GET", path, token, None).await;
        assert!(resp.status().is_success(), "GET {} -> {}", path, resp.status());
        resp.json().await.unwrap()
    }

    async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> Value {
        let resp = self.send("POST", path, token, Some(body)).await;
        assert!(resp.status().is_success(), "POST {} -> {}", path, resp.status());
        resp.json().await.unwrap()
    }
}

fn doctor(name: &str, specialty: u8) -> Value {
    json!({
        "name": name,
        "email": "doc@clinic.org",
        "phone": "+1 555 010 0200",
        "specialty": specialty,
        "department": 0,
        "languages": ["English"],
    })
}

#[tokio::test]
async fn public_endpoints_need_no_token() {
    let server = TestServer::start().await;
    let health = server.get_json("/health", None).await;
    assert_eq!(health["data"]["status"], "ok");

    let labels = server.get_json("/labels", None).await;
    assert_eq!(labels["data"]["specialty"][1], json!({ "value": 1, "label": "Cardiology" }));
    assert_eq!(labels["data"]["role"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn registration_and_login() {
    let server = TestServer::start().await;
    let token = server.patient_token("maria@example.com").await;

    let me = server.get_json("/auth/me", Some(&token)).await;
    assert_eq!(me["data"]["email"], "maria@example.com");
    assert_eq!(me["data"]["role"], 1);
    assert!(me["data"].get("password_hash").is_none());

    let again = server
        .send("POST", "/auth/register", None, Some(json!({
            "email": "MARIA@example.com",
            "display_name": "Someone Else",
            "password": "another-pass",
        })))
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let bad = server
        .send("POST", "/auth/login", None, Some(json!({ "email": "maria@example.com", "password": "nope-nope" })))
        .await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    let body: Value = bad.json().await.unwrap();
    assert!(body["error"].is_string());

    let anonymous = server.send("GET", "/auth/me", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let forged = server.send("GET", "/auth/me", Some("not.a.token"), None).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctor_management_is_admin_only() {
    let server = TestServer::start().await;
    let admin = server.admin_token().await;
    let patient = server.patient_token("pat@example.com").await;

    let denied = server.send("POST", "/doctors", Some(&patient), Some(doctor("Dr. X", 1))).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let resp = server.send("POST", "/doctors", Some(&admin), Some(doctor("Dr. Ana Lima", 1))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();
    server.post_json("/doctors", Some(&admin), doctor("Dr. Ben Okafor", 3)).await;

    let cardiology = server.get_json("/doctors?specialty=1", None).await;
    assert_eq!(cardiology["data"]["total"], 1);
    assert_eq!(cardiology["data"]["items"][0]["name"], "Dr. Ana Lima");

    let searched = server.get_json("/doctors?search=okafor", None).await;
    assert_eq!(searched["data"]["total"], 1);

    let bad_filter = server.send("GET", "/doctors?specialty=200", None, None).await;
    assert_eq!(bad_filter.status(), StatusCode::BAD_REQUEST);

    let mut update = doctor("Dr. Ana Lima", 2);
    update["bio"] = json!("Moved to dermatology.");
    let resp = server.send("PUT", &format!("/doctors/{}", id), Some(&admin), Some(update)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["specialty"], 2);
    assert_eq!(updated["data"]["revision"], 2);

    let resp = server.send("DELETE", &format!("/doctors/{}", id), Some(&admin), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let gone = server.send("GET", &format!("/doctors/{}", id), None, None).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let invalid = server.send("POST", "/doctors", Some(&admin), Some(json!({ "name": "No fields" }))).await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn doctor_csv_import_reports_bad_rows() {
    let server = TestServer::start().await;
    let admin = server.admin_token().await;
    let csv = "name,email,phone,specialty,department\n\
               Dr. One,one@clinic.org,+1 555 010 0001,Cardiology,Outpatient\n\
               Dr. Two,broken,+1 555 010 0002,1,0\n";
    let resp = server
        .client
        .post(server.url("/doctors/import"))
        .bearer_auth(&admin)
        .header("content-type", "text/csv")
        .body(csv)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["data"]["imported"], 1);
    assert_eq!(report["data"]["failed"][0]["line"], 3);
}

#[tokio::test]
async fn appointments_refuse_double_booking() {
    let server = TestServer::start().await;
    let admin = server.admin_token().await;
    let booking = |at: &str| {
        json!({
            "patient_id": "p1",
            "doctor_id": "d1",
            "scheduled_at": at,
            "appointment_type": 0,
            "duration": 3,
        })
    };
    server.post_json("/appointments", Some(&admin), booking("2026-06-01T09:00:00Z")).await;
    let clash = server
        .send("POST", "/appointments", Some(&admin), Some(booking("2026-06-01T09:30:00Z")))
        .await;
    assert_eq!(clash.status(), StatusCode::CONFLICT);
    server.post_json("/appointments", Some(&admin), booking("2026-06-01T10:00:00Z")).await;

    let listed = server.get_json("/appointments?doctor_id=d1", Some(&admin)).await;
    assert_eq!(listed["data"]["total"], 2);
    assert_eq!(listed["data"]["items"][0]["scheduled_at"], "2026-06-01T09:00:00Z");

    let patient = server.patient_token("pat@example.com").await;
    let denied = server.send("GET", "/appointments", Some(&patient), None).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn file_upload_and_download() {
    let mut config = AppConfig::default();
    config.files.max_upload_bytes = 16;
    let server = TestServer::start_with(config).await;
    let admin = server.admin_token().await;

    let resp = server
        .client
        .post(server.url("/files?name=logo.png"))
        .bearer_auth(&admin)
        .header("content-type", "image/png")
        .body(vec![1u8, 2, 3, 4])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let meta: Value = resp.json().await.unwrap();
    let id = meta["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(meta["data"]["size"], 4);

    let download = server.send("GET", &format!("/files/{}", id), None, None).await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()["content-type"], "image/png");
    assert_eq!(download.bytes().await.unwrap().as_ref(), &[1u8, 2, 3, 4]);

    let too_big = server
        .client
        .post(server.url("/files?name=big.bin"))
        .bearer_auth(&admin)
        .body(vec![0u8; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(too_big.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

async fn open_chat(server: &TestServer, patient: &str) -> String {
    let admins = server.get_json("/admins", Some(patient)).await;
    let admin_id = admins["data"][0]["id"].as_str().unwrap().to_string();
    let chat = server.post_json("/chats", Some(patient), json!({ "admin_id": admin_id })).await;
    chat["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn support_chat_flow() {
    let server = TestServer::start().await;
    let admin = server.admin_token().await;
    let patient = server.patient_token("pat@example.com").await;
    let chat_id = open_chat(&server, &patient).await;

    // Opening again returns the same conversation.
    assert_eq!(open_chat(&server, &patient).await, chat_id);

    server
        .post_json(&format!("/chats/{}/messages", chat_id), Some(&patient), json!({ "content": "Hello?" }))
        .await;
    let summaries = server.get_json("/chats", Some(&admin)).await;
    assert_eq!(summaries["data"][0]["unread"], 1);
    assert_eq!(summaries["data"][0]["last_message"]["content"], "Hello?");

    let read = server.post_json(&format!("/chats/{}/read", chat_id), Some(&admin), json!({})).await;
    assert_eq!(read["data"]["marked"], 1);

    let view = server.get_json(&format!("/chats/{}", chat_id), Some(&patient)).await;
    assert_eq!(view["data"]["messages"][0]["is_read"], true);

    let empty = server
        .send("POST", &format!("/chats/{}/messages", chat_id), Some(&patient), Some(json!({ "content": "   " })))
        .await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let stranger = server.patient_token("other@example.com").await;
    let denied = server.send("GET", &format!("/chats/{}", chat_id), Some(&stranger), None).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn concurrent_http_sends_keep_every_message() {
    let mut config = AppConfig::default();
    config.chat.max_append_retries = 64;
    let server = TestServer::start_with(config).await;
    let admin = server.admin_token().await;
    let patient = server.patient_token("pat@example.com").await;
    let chat_id = open_chat(&server, &patient).await;

    let path = format!("/chats/{}/messages", chat_id);
    let sends = (0..12).map(|i| {
        let token = if i % 2 == 0 { patient.clone() } else { admin.clone() };
        let server = &server;
        let path = path.clone();
        async move {
            server
                .send("POST", &path, Some(&token), Some(json!({ "content": format!("message {}", i) })))
                .await
                .status()
        }
    });
    for status in futures::future::join_all(sends).await {
        assert_eq!(status, StatusCode::CREATED);
    }

    let view = server.get_json(&format!("/chats/{}", chat_id), Some(&admin)).await;
    assert_eq!(view["data"]["messages"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn chat_events_stream_pushes_new_messages() {
    let server = TestServer::start().await;
    let patient = server.patient_token("pat@example.com").await;
    let chat_id = open_chat(&server, &patient).await;

    let mut stream = server
        .client
        .get(server.url(&format!("/chats/{}/events?access_token={}", chat_id, patient)))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);

    server
        .post_json(&format!("/chats/{}/messages", chat_id), Some(&patient), json!({ "content": "ping from sse" }))
        .await;

    let mut received = String::new();
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = stream.chunk().await.unwrap() {
            received.push_str(&String::from_utf8_lossy(&chunk));
            if received.contains("ping from sse") {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(found);
    assert!(received.contains("event: chat"));
}

#[tokio::test]
async fn sled_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.engine = lib::config::StorageEngineType::Sled;
    config.storage.data_directory = dir.path().to_path_buf();
    config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
    config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());

    let (admin_id, file_id) = {
        let state = AppState::open(config.clone()).await.unwrap();
        let admins = state.users.admins().await.unwrap();
        assert_eq!(admins.len(), 1);
        let stored = state
            .files
            .upload("note.txt", "text/plain", bytes::Bytes::from_static(b"kept"))
            .await
            .unwrap();
        state.db.store().flush().await.unwrap();
        (admins[0].id.clone(), stored.id)
    };

    // Reopening runs the bootstrap again without duplicating the account.
    let state = AppState::open(config).await.unwrap();
    let admins = state.users.admins().await.unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].id, admin_id);
    let (meta, content) = state.files.download(&file_id).await.unwrap();
    assert_eq!(meta.name, "note.txt");
    assert_eq!(&content[..], b"kept");
}
