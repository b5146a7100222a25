// tests/api_tests.rs

use std::sync::Arc;

use mocktest_backend::{
    config::Config,
    exam::registry::SessionRegistry,
    exam::timer::SystemClock,
    models::test::{Question, QuestionType, TestDefinition},
    routes,
    state::{AppState, Stores},
    store::memory::MemoryStore,
};
use sqlx::types::Json;

fn fixture_question(id: &str, correct: &str) -> Question {
    Question {
        id: id.to_string(),
        text: format!("Question {}", id),
        image: None,
        question_type: QuestionType::Mcq,
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        option_images: vec![],
        correct_option: Some(correct.to_string()),
        correct_options: None,
        integer_answer: None,
        marks: 4.0,
        negative_marks: 1.0,
        subject: Some("physics".to_string()),
        topic: None,
    }
}

fn fixture_test(id: i64) -> TestDefinition {
    TestDefinition {
        id,
        title: "Full Mock 1".to_string(),
        duration_minutes: 30,
        total_marks: 8.0,
        category: "mock".to_string(),
        instructions: "<p>Answer everything.</p><script>alert(1)</script>".to_string(),
        questions: Json(vec![fixture_question("q1", "A"), fixture_question("q2", "B")]),
        max_attempts: None,
        created_at: None,
    }
}

/// Helper to spawn the app on a random port, backed by the in-memory store.
/// Returns the base URL and the store for seeding/inspection.
async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.seed_test(fixture_test(1));

    let config = Config {
        database_url: "postgres://unused-in-tests".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        violation_limit: 2,
        force_submit_on_hide: false,
    };

    let stores = Stores {
        tests: store.clone(),
        results: store.clone(),
        users: store.clone(),
    };
    let state = AppState {
        stores,
        sessions: SessionRegistry::new(Arc::new(SystemClock)),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

async fn sync_user(client: &reqwest::Client, address: &str, uid: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/sync", address))
        .json(&serde_json::json!({
            "name": "Asha",
            "email": format!("{}@example.com", uid),
            "firebase_uid": uid,
        }))
        .send()
        .await
        .expect("Sync failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse sync json");

    response["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn sync_issues_a_token() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/sync", address))
        .json(&serde_json::json!({
            "name": "Asha",
            "email": "asha@example.com",
            "firebase_uid": "uid_sync_1",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["role"], "student");
}

#[tokio::test]
async fn sync_fails_validation() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: not an email address
    let response = client
        .post(format!("{}/api/auth/sync", address))
        .json(&serde_json::json!({
            "name": "Asha",
            "email": "not-an-email",
            "firebase_uid": "uid_sync_2",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn tests_require_authentication() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/tests/1", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn unknown_test_is_404() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sync_user(&client, &address, "uid_404").await;

    let response = client
        .get(format!("{}/api/tests/999", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_paper_hides_answer_keys_and_sanitizes_markup() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sync_user(&client, &address, "uid_paper").await;

    let response = client
        .get(format!("{}/api/tests/1", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    let raw = body.to_string();
    assert!(!raw.contains("correct_option"), "answer keys must not leak");
    assert!(!raw.contains("subject"), "analytics tags must not leak");
    assert!(!body["instructions"].as_str().unwrap().contains("<script>"));
}

#[tokio::test]
async fn test_catalog_lists_seeded_tests() {
    let (address, _store) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = sync_user(&client, &address, "uid_catalog").await;

    let response = client
        .get(format!("{}/api/tests", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let tests = body.as_array().unwrap();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0]["question_count"], 2);
}
