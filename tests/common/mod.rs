// tests/common/mod.rs

//! In-memory stand-in for the lesson backend, served over real HTTP.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lesson_client::{ApiClient, AuthState, config::Config};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const SECRET: &str = "test_secret_for_integration_tests";
pub const PASSWORD: &str = "correct-horse";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub exp: u64,
}

pub fn sign_token(expires_in_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let claims = Claims {
        user_id: 1,
        email: "student@example.com".into(),
        role: "user".into(),
        exp: (now + expires_in_secs) as u64,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub struct StoredQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub correct: String,
}

#[derive(Default)]
pub struct MockBackend {
    pub questions: Vec<StoredQuestion>,
    pub sessions: Mutex<Vec<Value>>,
    pub taken: Mutex<Option<String>>,
    pub progress: Mutex<HashMap<i64, Value>>,
    pub progress_delay_ms: Mutex<HashMap<i64, u64>>,
    pub reject_submit: AtomicBool,
    pub hits: Mutex<Vec<String>>,
    pub certificate_requests: Mutex<Vec<(Option<String>, Option<String>)>>,
    pub practice_submissions: Mutex<Vec<Value>>,
}

impl MockBackend {
    pub fn hits_for(&self, path: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }
}

type Shared = Arc<MockBackend>;

pub struct TestApp {
    pub address: String,
    pub backend: Shared,
}

impl TestApp {
    /// A client for this server with no credential.
    pub fn client(&self) -> ApiClient {
        let config = Config::for_base_url(&self.address).unwrap();
        ApiClient::new(&config, AuthState::new()).unwrap()
    }

    /// A client already holding a valid credential.
    pub fn logged_in_client(&self) -> ApiClient {
        let client = self.client();
        client.auth().set_token(sign_token(600)).unwrap();
        client
    }

    /// A logged-in client configured the way `REQUEST_TIMEOUT_SECS` would set it.
    pub fn logged_in_client_with_timeout(&self, secs: &str) -> ApiClient {
        let address = self.address.clone();
        let timeout = secs.to_string();
        let config = Config::from_lookup(move |key| match key {
            "API_BASE_URL" => Some(address.clone()),
            "REQUEST_TIMEOUT_SECS" => Some(timeout.clone()),
            _ => None,
        })
        .unwrap();
        let client = ApiClient::new(&config, AuthState::new()).unwrap();
        client.auth().set_token(sign_token(600)).unwrap();
        client
    }
}

fn question_bank() -> Vec<StoredQuestion> {
    (1..=40)
        .map(|id| StoredQuestion {
            id,
            question: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct: "A".into(),
        })
        .collect()
}

/// Helper function to spawn the mock backend on a random port for testing.
pub async fn spawn_app() -> TestApp {
    let backend: Shared = Arc::new(MockBackend {
        questions: question_bank(),
        ..Default::default()
    });

    let protected = Router::new()
        .route("/auth/me", get(me))
        .route("/test-sessions/check/status", get(check_status))
        .route("/test-sessions/start", post(start_session))
        .route("/test-sessions/submit", post(submit_session))
        .route("/test-sessions/history", get(history))
        .route("/test-sessions/certificate/{id}", get(certificate))
        .route("/test-sessions/{id}", get(get_session))
        .route("/progress/material/{id}", get(material_progress))
        .route("/progress/complete", post(mark_complete))
        .route("/progress/submit-test", post(submit_practice))
        .route("/sections/", get(sections))
        .route("/materials/sectionId/{id}", get(materials_by_section))
        .route("/materials/{id}", get(material))
        .route("/tests/material/{id}", get(tests_by_material))
        .route_layer(middleware::from_fn(auth_middleware));

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/user", post(register))
        .merge(protected)
        .layer(middleware::from_fn_with_state(backend.clone(), record_hit))
        .with_state(backend.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, backend }
}

async fn record_hit(State(backend): State<Shared>, req: Request<Body>, next: Next) -> Response {
    backend.hits.lock().unwrap().push(req.uri().path().to_string());
    next.run(req).await
}

/// Validates 'Authorization: Bearer <token>' and injects the claims.
async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(detail(StatusCode::UNAUTHORIZED, "Not authenticated")),
    };

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => {
            req.extensions_mut().insert(data.claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    if body.password != PASSWORD || body.username.is_empty() {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }
    Json(json!({ "access_token": sign_token(600), "token_type": "bearer" })).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return detail(StatusCode::BAD_REQUEST, "Username already registered");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 2,
            "username": body["username"],
            "firstname": body["firstname"],
            "lastname": body["lastname"],
        })),
    )
        .into_response()
}

async fn me(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({
        "id": claims.user_id,
        "username": "student",
        "firstname": "Test",
        "lastname": "Student",
    }))
}

async fn check_status(State(backend): State<Shared>) -> Json<Value> {
    let taken = backend.taken.lock().unwrap().clone();
    Json(json!({
        "has_taken_test": taken.is_some(),
        "existing_session_id": taken,
        "test_question_count": 30,
        "total_available_tests": backend.questions.len(),
    }))
}

#[derive(Deserialize)]
struct StartBody {
    num_questions: usize,
}

async fn start_session(State(backend): State<Shared>, Json(body): Json<StartBody>) -> Response {
    if backend.taken.lock().unwrap().is_some() {
        return detail(
            StatusCode::BAD_REQUEST,
            "Siz allaqachon yakuniy testni topshirgansiz. Faqat bir marta topshirish mumkin.",
        );
    }

    let questions: Vec<Value> = backend
        .questions
        .iter()
        .take(body.num_questions)
        .map(|q| json!({ "id": q.id, "question": q.question, "options": q.options }))
        .collect();

    Json(json!({
        "session_id": uuid::Uuid::new_v4().to_string(),
        "questions": questions,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct SubmitBody {
    session_id: String,
    answers: HashMap<String, String>,
    question_ids: Vec<i64>,
}

async fn submit_session(State(backend): State<Shared>, Json(body): Json<SubmitBody>) -> Response {
    if backend.reject_submit.load(Ordering::SeqCst) {
        return detail(StatusCode::UNAUTHORIZED, "Token expired");
    }

    let results: Vec<Value> = body
        .question_ids
        .iter()
        .filter_map(|id| backend.questions.iter().find(|q| q.id == *id))
        .map(|q| {
            let answer = body.answers.get(&q.id.to_string());
            json!({
                "test_id": q.id,
                "question": q.question,
                "user_answer": answer,
                "correct_answer": q.correct,
                "is_correct": answer == Some(&q.correct),
            })
        })
        .collect();

    let total = results.len();
    let correct = results.iter().filter(|r| r["is_correct"] == true).count();
    let percentage = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    };

    let session = json!({
        "id": body.session_id,
        "total_questions": total,
        "correct_answers": correct,
        "score_percentage": percentage,
        "passed": if percentage >= 75.0 { 1 } else { 0 },
        "created_at": "2024-05-01T10:00:00.123456",
        "test_data": { "results": results, "submitted_at": "2024-05-01T10:20:00" },
    });

    backend.sessions.lock().unwrap().insert(0, session.clone());
    *backend.taken.lock().unwrap() = Some(body.session_id);
    Json(session).into_response()
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: usize,
}

async fn history(State(backend): State<Shared>, Query(query): Query<HistoryQuery>) -> Json<Value> {
    let sessions = backend.sessions.lock().unwrap();
    let page: Vec<Value> = sessions.iter().take(query.limit).cloned().collect();
    Json(json!({ "sessions": page, "total_sessions": sessions.len() }))
}

fn find_session(backend: &MockBackend, id: &str) -> Option<Value> {
    backend
        .sessions
        .lock()
        .unwrap()
        .iter()
        .find(|s| s["id"] == id)
        .cloned()
}

async fn get_session(State(backend): State<Shared>, Path(id): Path<String>) -> Response {
    match find_session(&backend, &id) {
        Some(session) => Json(session).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Test session not found"),
    }
}

async fn certificate(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    backend.certificate_requests.lock().unwrap().push((
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        uri.query().map(str::to_string),
    ));

    match find_session(&backend, &id) {
        None => detail(StatusCode::NOT_FOUND, "Test session not found"),
        Some(session) if session["passed"] != 1 => {
            detail(StatusCode::FORBIDDEN, "Certificate is only available for passed tests")
        }
        Some(_) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"certificate_{}.pdf\"", id),
                ),
            ],
            b"%PDF-1.4 mock certificate".to_vec(),
        )
            .into_response(),
    }
}

fn default_progress(material_id: i64) -> Value {
    json!({
        "material_id": material_id,
        "pdf_completed": false,
        "pdf_attachment_id": format!("pdf-{}", material_id),
        "video_completed": false,
        "video_attachment_id": format!("vid-{}", material_id),
        "total_tests": 2,
        "completed_tests": 0,
        "test_progress": [],
        "percentage": 0,
    })
}

async fn material_progress(State(backend): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    let delay = backend.progress_delay_ms.lock().unwrap().get(&id).copied();
    if let Some(ms) = delay {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    let record = backend
        .progress
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .unwrap_or_else(|| default_progress(id));
    Json(record)
}

#[derive(Deserialize)]
struct CompleteBody {
    attachment_id: Option<String>,
    test_id: Option<i64>,
}

async fn mark_complete(State(backend): State<Shared>, Json(body): Json<CompleteBody>) -> Response {
    let Some(attachment_id) = body.attachment_id else {
        return detail(StatusCode::BAD_REQUEST, "attachment_id is required");
    };
    let Some(material_id) = attachment_id
        .split_once('-')
        .and_then(|(_, id)| id.parse::<i64>().ok())
    else {
        return detail(StatusCode::NOT_FOUND, "Attachment not found");
    };

    let mut progress = backend.progress.lock().unwrap();
    let record = progress
        .entry(material_id)
        .or_insert_with(|| default_progress(material_id));
    if attachment_id.starts_with("pdf-") {
        record["pdf_completed"] = json!(true);
    } else {
        record["video_completed"] = json!(true);
    }
    let done = [record["pdf_completed"] == true, record["video_completed"] == true]
        .iter()
        .filter(|d| **d)
        .count();
    record["percentage"] = json!(done as f64 * 25.0);

    Json(json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "attachment_id": attachment_id,
        "test_id": body.test_id,
        "is_completed": 1,
    }))
    .into_response()
}

async fn submit_practice(State(backend): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    backend.practice_submissions.lock().unwrap().push(body.clone());

    let material_id = body["material_id"].as_i64().unwrap_or_default();
    let answers = body["answers"].as_object().cloned().unwrap_or_default();
    let correct = answers.values().filter(|a| *a == "yes").count();

    let mut progress = backend.progress.lock().unwrap();
    let record = progress
        .entry(material_id)
        .or_insert_with(|| default_progress(material_id));
    record["completed_tests"] = json!(answers.len());
    record["test_submitted"] = json!(true);
    record["percentage"] = json!(50.0);

    Json(json!({
        "correct_count": correct,
        "total_tests": answers.len(),
        "results": [],
    }))
}

async fn sections() -> Json<Value> {
    Json(json!([{ "id": 1, "name": "Basics" }, { "id": 2, "name": "Advanced" }]))
}

async fn materials_by_section(Path(id): Path<i64>) -> Json<Value> {
    Json(json!([
        { "id": 5, "section_id": id, "title": "Getting started", "attachments": [] },
        { "id": 9, "section_id": id, "title": "Going further", "attachments": [] },
    ]))
}

async fn material(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return detail(StatusCode::NOT_FOUND, "Material not found");
    }
    // This endpoint answers with a one-element list.
    Json(json!([{
        "id": id,
        "section_id": 1,
        "title": "Going further",
        "attachments": [
            { "id": format!("pdf-{}", id), "type": "file", "path": "uploads/notes.pdf" },
            { "id": format!("vid-{}", id), "type": "link", "path": "https://video.example/1", "name": "Lecture" },
        ],
    }]))
    .into_response()
}

async fn tests_by_material(Path(id): Path<i64>) -> Json<Value> {
    Json(json!([
        { "id": 101, "material_id": id, "question": "Is it?", "options": ["yes", "no"] },
        { "id": 102, "material_id": id, "question": "Really?", "options": ["yes", "no"] },
    ]))
}
