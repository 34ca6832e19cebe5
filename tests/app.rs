//! End-to-end tests over the full router
//!
//! The OCR engine and the payment provider are stubbed at their trait seams;
//! everything else (sessions, sqlite, storage directories, multipart
//! handling) is the real thing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestServer, TestServerConfig};
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

use ocr_forge::billing::{BillingError, CheckoutProvider};
use ocr_forge::config::Config;
use ocr_forge::db;
use ocr_forge::ocr::{OcrEngine, OcrError, OcrOutcome};
use ocr_forge::state::AppState;

// ============================================================================
// Stubs
// ============================================================================

/// Engine stub that writes a small output file and reports `outcome`
struct StubOcr {
    outcome: OcrOutcome,
}

#[async_trait]
impl OcrEngine for StubOcr {
    async fn ocr(
        &self,
        _input: &Path,
        output: &Path,
        _language: &str,
    ) -> Result<OcrOutcome, OcrError> {
        tokio::fs::write(output, b"%PDF-1.4 stub output")
            .await
            .unwrap();
        Ok(self.outcome)
    }
}

/// Engine stub that always fails without producing output
struct FailingOcr;

#[async_trait]
impl OcrEngine for FailingOcr {
    async fn ocr(
        &self,
        _input: &Path,
        _output: &Path,
        _language: &str,
    ) -> Result<OcrOutcome, OcrError> {
        Err(OcrError::Engine {
            code: 2,
            stderr: "input file is corrupt".to_string(),
        })
    }
}

/// Provider stub that hands out a fixed checkout URL
struct StubCheckout {
    url: String,
}

#[async_trait]
impl CheckoutProvider for StubCheckout {
    async fn create_checkout(
        &self,
        _customer_email: &str,
        _success_url: &str,
        _cancel_url: &str,
    ) -> Result<String, BillingError> {
        Ok(self.url.clone())
    }
}

/// Provider stub that always fails
struct FailingCheckout;

#[async_trait]
impl CheckoutProvider for FailingCheckout {
    async fn create_checkout(
        &self,
        _customer_email: &str,
        _success_url: &str,
        _cancel_url: &str,
    ) -> Result<String, BillingError> {
        Err(BillingError::Api {
            status: 403,
            body: "forbidden".to_string(),
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

struct TestApp {
    server: TestServer,
    pool: SqlitePool,
    download_dir: PathBuf,
    _dir: TempDir,
}

async fn spawn(ocr: Arc<dyn OcrEngine>, billing: Arc<dyn CheckoutProvider>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let upload_dir = dir.path().join("uploads");
    let download_dir = dir.path().join("downloads");
    std::fs::create_dir_all(&upload_dir).unwrap();
    std::fs::create_dir_all(&download_dir).unwrap();

    let mut config = Config::default();
    config.storage.upload_dir = upload_dir;
    config.storage.download_dir = download_dir.clone();
    config.database.url = format!("sqlite://{}", dir.path().join("test.db").display());

    let pool = db::create_pool(&config.database.url).await.unwrap();
    let state = AppState::new(config, pool.clone(), ocr, billing);

    let server_config = TestServerConfig {
        save_cookies: true,
        ..TestServerConfig::default()
    };
    let server = TestServer::new_with_config(ocr_forge::app(state), server_config).unwrap();

    TestApp {
        server,
        pool,
        download_dir,
        _dir: dir,
    }
}

async fn spawn_default() -> TestApp {
    spawn(
        Arc::new(StubOcr {
            outcome: OcrOutcome::Converted,
        }),
        Arc::new(StubCheckout {
            url: "https://checkout.example/txn_42".to_string(),
        }),
    )
    .await
}

async fn register_and_login(server: &TestServer, email: &str) {
    let response = server
        .post("/register")
        .form(&json!({ "email": email, "password": "hunter2" }))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);

    let response = server
        .post("/login")
        .form(&json!({ "email": email, "password": "hunter2" }))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
}

fn pdf_upload(filename: &str) -> MultipartForm {
    MultipartForm::new().add_text("language", "eng").add_part(
        "file",
        Part::bytes(b"%PDF-1.4 test input".to_vec())
            .file_name(filename)
            .mime_type("application/pdf"),
    )
}

async fn pages_processed(pool: &SqlitePool, email: &str) -> i64 {
    sqlx::query_scalar("SELECT pages_processed FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn plan(pool: &SqlitePool, email: &str) -> String {
    sqlx::query_scalar("SELECT plan FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn set_pages_processed(pool: &SqlitePool, email: &str, pages: i64) {
    sqlx::query("UPDATE accounts SET pages_processed = ? WHERE email = ?")
        .bind(pages)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
}

fn download_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// ============================================================================
// Health & gating
// ============================================================================

#[tokio::test]
async fn health_reports_version() {
    let app = spawn_default().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unauthenticated_upload_redirects_to_login_with_next() {
    let app = spawn_default().await;
    let response = app.server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login?next=%2F");
}

#[tokio::test]
async fn unauthenticated_checkout_is_gated() {
    let app = spawn_default().await;
    let response = app.server.get("/create-checkout").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        "/login?next=%2Fcreate-checkout"
    );
}

// ============================================================================
// Registration & login
// ============================================================================

#[tokio::test]
async fn duplicate_registration_fails_and_keeps_one_record() {
    let app = spawn_default().await;

    let response = app
        .server
        .post("/register")
        .form(&json!({ "email": "dup@example.com", "password": "first" }))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);

    let response = app
        .server
        .post("/register")
        .form(&json!({ "email": "dup@example.com", "password": "second" }))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE email = ?")
        .bind("dup@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let response = app.server.get("/login").await;
    assert!(response.text().contains("Email address already exists"));
}

#[tokio::test]
async fn raw_password_is_never_stored() {
    let app = spawn_default().await;
    register_and_login(&app.server, "secret@example.com").await;

    let hash: String = sqlx::query_scalar("SELECT password_hash FROM accounts WHERE email = ?")
        .bind("secret@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_ne!(hash, "hunter2");
    assert!(!hash.contains("hunter2"));
}

#[tokio::test]
async fn wrong_password_establishes_no_session() {
    let app = spawn_default().await;

    app.server
        .post("/register")
        .form(&json!({ "email": "user@example.com", "password": "hunter2" }))
        .await;

    let response = app
        .server
        .post("/login")
        .form(&json!({ "email": "user@example.com", "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");

    // Still gated
    let response = app.server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login?next=%2F");

    // Failure message is generic
    let response = app.server.get("/login").await;
    assert!(response
        .text()
        .contains("Login failed. Please check your email and password."));
}

#[tokio::test]
async fn login_grants_access_without_reauthenticating() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("user@example.com"));

    // A second request rides the same session
    let response = app.server.get("/").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn logout_tears_down_session_and_is_idempotent() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.get("/logout").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");

    let response = app.server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);

    // Logging out again without a session is fine
    let response = app.server.get("/logout").await;
    response.assert_status(StatusCode::SEE_OTHER);
}

// ============================================================================
// Upload validation & quota
// ============================================================================

#[tokio::test]
async fn non_pdf_upload_never_reaches_the_engine() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.post("/").multipart(pdf_upload("notes.txt")).await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 0);
    assert_eq!(download_count(&app.download_dir), 0);

    let response = app.server.get("/").await;
    assert!(response.text().contains("Please select a valid PDF file."));
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let form = MultipartForm::new().add_text("language", "eng");
    let response = app.server.post("/").multipart(form).await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 0);

    let response = app.server.get("/").await;
    assert!(response.text().contains("No file selected."));
}

#[tokio::test]
async fn missing_language_is_rejected() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.4 test input".to_vec())
            .file_name("scan.pdf")
            .mime_type("application/pdf"),
    );
    let response = app.server.post("/").multipart(form).await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 0);
    assert_eq!(download_count(&app.download_dir), 0);
}

#[tokio::test]
async fn successful_upload_increments_usage_by_one() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.post("/").multipart(pdf_upload("scan.pdf")).await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 1);
    assert_eq!(download_count(&app.download_dir), 1);

    let response = app.server.get("/").await;
    let text = response.text();
    assert!(text.contains("Click here to download."));
    assert!(text.contains("Usage: 1/5 pages."));
}

#[tokio::test]
async fn already_searchable_input_still_counts_as_success() {
    let app = spawn(
        Arc::new(StubOcr {
            outcome: OcrOutcome::AlreadyHasText,
        }),
        Arc::new(StubCheckout {
            url: "https://checkout.example/txn_42".to_string(),
        }),
    )
    .await;
    register_and_login(&app.server, "user@example.com").await;

    app.server.post("/").multipart(pdf_upload("scan.pdf")).await;

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 1);
    assert_eq!(download_count(&app.download_dir), 1);
}

#[tokio::test]
async fn free_plan_is_cut_off_at_its_ceiling() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;
    set_pages_processed(&app.pool, "user@example.com", 5).await;

    let response = app.server.post("/").multipart(pdf_upload("scan.pdf")).await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 5);
    assert_eq!(download_count(&app.download_dir), 0);

    let response = app.server.get("/").await;
    assert!(response
        .text()
        .contains("You have reached your processing limit of 5 pages"));
}

#[tokio::test]
async fn pro_plan_ceiling_is_two_hundred() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    sqlx::query("UPDATE accounts SET plan = 'pro' WHERE email = ?")
        .bind("user@example.com")
        .execute(&app.pool)
        .await
        .unwrap();
    set_pages_processed(&app.pool, "user@example.com", 5).await;

    // 5 pages would exhaust the free plan; pro sails through
    app.server.post("/").multipart(pdf_upload("scan.pdf")).await;
    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 6);

    set_pages_processed(&app.pool, "user@example.com", 200).await;
    app.server.post("/").multipart(pdf_upload("scan.pdf")).await;
    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 200);
}

#[tokio::test]
async fn engine_failure_leaves_usage_unchanged() {
    let app = spawn(
        Arc::new(FailingOcr),
        Arc::new(StubCheckout {
            url: "https://checkout.example/txn_42".to_string(),
        }),
    )
    .await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.post("/").multipart(pdf_upload("scan.pdf")).await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 0);
    assert_eq!(download_count(&app.download_dir), 0);

    let response = app.server.get("/").await;
    let text = response.text();
    assert!(text.contains("An error occurred during OCR:"));
    assert!(text.contains("input file is corrupt"));
}

// ============================================================================
// Downloads
// ============================================================================

#[tokio::test]
async fn converted_file_downloads_as_attachment() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;
    app.server.post("/").multipart(pdf_upload("scan.pdf")).await;

    let filename = std::fs::read_dir(&app.download_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .file_name()
        .into_string()
        .unwrap();
    assert!(filename.ends_with("_searchable.pdf"));

    let response = app.server.get(&format!("/downloads/{filename}")).await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/pdf");
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("attachment"));
    assert_eq!(response.as_bytes().as_ref(), b"%PDF-1.4 stub output" as &[u8]);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app
        .server
        .get("/downloads/00000000-0000-0000-0000-000000000000_searchable.pdf")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_names_are_rejected() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app
        .server
        .get("/downloads/..%2F..%2Fetc%2Fpasswd_searchable.pdf")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app.server.get("/downloads/notes.txt").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn downloads_require_a_session() {
    let app = spawn_default().await;
    let response = app
        .server
        .get("/downloads/00000000-0000-0000-0000-000000000000_searchable.pdf")
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert!(response
        .header("location")
        .to_str()
        .unwrap()
        .starts_with("/login?next="));
}

// ============================================================================
// Plan upgrade
// ============================================================================

#[tokio::test]
async fn checkout_redirects_to_provider() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.get("/create-checkout").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "https://checkout.example/txn_42");
}

#[tokio::test]
async fn checkout_failure_is_flashed_not_fatal() {
    let app = spawn(
        Arc::new(StubOcr {
            outcome: OcrOutcome::Converted,
        }),
        Arc::new(FailingCheckout),
    )
    .await;
    register_and_login(&app.server, "user@example.com").await;

    let response = app.server.get("/create-checkout").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");

    let response = app.server.get("/").await;
    assert!(response.text().contains("Error communicating with provider:"));
    assert_eq!(plan(&app.pool, "user@example.com").await, "free");
}

#[tokio::test]
async fn success_callback_upgrades_plan_and_resets_usage() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;
    set_pages_processed(&app.pool, "user@example.com", 5).await;

    let response = app.server.get("/success").await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(plan(&app.pool, "user@example.com").await, "pro");
    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 0);

    // The new ceiling applies immediately
    app.server.post("/").multipart(pdf_upload("scan.pdf")).await;
    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 1);

    let response = app.server.get("/").await;
    assert!(response.text().contains("Usage: 1/200 pages."));
}

#[tokio::test]
async fn cancel_callback_changes_nothing() {
    let app = spawn_default().await;
    register_and_login(&app.server, "user@example.com").await;
    set_pages_processed(&app.pool, "user@example.com", 3).await;

    let response = app.server.get("/cancel").await;
    response.assert_status(StatusCode::SEE_OTHER);

    assert_eq!(plan(&app.pool, "user@example.com").await, "free");
    assert_eq!(pages_processed(&app.pool, "user@example.com").await, 3);

    let response = app.server.get("/").await;
    assert!(response.text().contains("Payment was cancelled."));
}
