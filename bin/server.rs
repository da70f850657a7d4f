// Statement Insights - Web Server
// Upload a statement, view the summary, download the CSV

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Serialize;
use statement_insights::{
    csv_filename, format_amount, metric_rows, to_csv_bytes, AggregateReport, Analyzer, Config,
    InMemoryReportStore, PdfTextExtractor, ReportStore, SessionId, VERSION,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

const SESSION_COOKIE: &str = "session";

/// Shared application state
#[derive(Clone)]
struct AppState {
    analyzer: Analyzer,
    store: Arc<dyn ReportStore>,
    secret_key: Arc<str>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: &str) -> Self {
        Self {
            success: false,
            data,
            error: Some(message.to_string()),
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

struct Session {
    id: SessionId,
    is_new: bool,
}

impl Session {
    /// Reuse the cookie's session if its tag verifies, else start a new one
    fn from_headers(headers: &HeaderMap, secret_key: &str) -> Self {
        let prefix = format!("{}=", SESSION_COOKIE);
        let existing = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().strip_prefix(prefix.as_str()))
            .find_map(|value| SessionId::from_cookie_value(value, secret_key));

        match existing {
            Some(id) => Session { id, is_new: false },
            None => Session { id: SessionId::new(), is_new: true },
        }
    }

    /// Attach the cookie to a response when the session was just created
    fn attach(&self, secret_key: &str, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();

        if self.is_new {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE,
                self.id.to_cookie_value(secret_key)
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}

// ============================================================================
// Page rendering
// ============================================================================

enum Message {
    Notice(String),
    Error(String),
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match m {
            Message::Notice(text) => format!("<div class=\"message notice\">{}</div>", escape_html(text)),
            Message::Error(text) => format!("<div class=\"message error\">{}</div>", escape_html(text)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_report(report: Option<&AggregateReport>) -> String {
    let Some(report) = report else {
        return "<section class=\"empty\">Upload a statement to see your summary.</section>".to_string();
    };

    let rows = metric_rows(report)
        .into_iter()
        .map(|(metric, value)| {
            format!("<tr><th>{}</th><td>{}</td></tr>", escape_html(metric), escape_html(&value))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "<section class=\"result\">\n\
         <p class=\"insight\">{}</p>\n\
         <table class=\"metrics\">\n{}\n</table>\n\
         <p><a href=\"/export\">Download CSV</a></p>\n\
         </section>",
        escape_html(report.insight.message()),
        rows
    )
}

fn render_page(state: &AppState, messages: &[Message], report: Option<&AggregateReport>) -> Html<String> {
    let threshold = format_amount(
        state.analyzer.threshold(),
        report.and_then(|r| r.currency),
    );

    Html(
        include_str!("../web/index.html")
            .replace("{{messages}}", &render_messages(messages))
            .replace("{{content}}", &render_report(report))
            .replace("{{heuristic}}", state.analyzer.heuristic().name())
            .replace("{{threshold}}", &threshold)
            .replace("{{version}}", VERSION),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Empty state, or the last report of this session
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = Session::from_headers(&headers, &state.secret_key);
    let report = state.store.get(&session.id);

    let notices: Vec<Message> = report
        .iter()
        .flat_map(|r| r.notices.iter().cloned().map(Message::Notice))
        .collect();
    let page = render_page(&state, &notices, report.as_ref());

    session.attach(&state.secret_key, page)
}

/// POST /analyze - Multipart upload with a single `file` field
async fn analyze(State(state): State<AppState>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    let session = Session::from_headers(&headers, &state.secret_key);

    let mut filename: Option<String> = None;
    let mut bytes = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                filename = Some(field.file_name().unwrap_or_default().to_string());
                match field.bytes().await {
                    Ok(data) => bytes = data.to_vec(),
                    Err(e) => {
                        warn!("Upload rejected while reading file field: {}", e);
                        let page = render_page(&state, &[Message::Error(e.body_text())], None);
                        return session.attach(&state.secret_key, (e.status(), page));
                    }
                }
                break;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Upload rejected, malformed multipart body: {}", e);
                let page = render_page(&state, &[Message::Error(e.body_text())], None);
                return session.attach(&state.secret_key, (e.status(), page));
            }
        }
    }

    let analyzer = state.analyzer.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        analyzer.analyze_upload(filename.as_deref(), &bytes)
    })
    .await;

    let response = match outcome {
        Ok(Ok(report)) => {
            info!("Session {}: {}", session.id, report.summary());
            let notices: Vec<Message> = report.notices.iter().cloned().map(Message::Notice).collect();
            let page = render_page(&state, &notices, Some(&report));
            state.store.put(session.id, report);
            (StatusCode::OK, page)
        }
        Ok(Err(e)) if e.is_validation() => {
            warn!("Session {}: upload rejected: {}", session.id, e);
            (StatusCode::BAD_REQUEST, render_page(&state, &[Message::Error(e.user_message())], None))
        }
        Ok(Err(e)) => {
            error!("Session {}: analysis failed: {}", session.id, e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                render_page(&state, &[Message::Error(e.user_message())], None),
            )
        }
        Err(e) => {
            error!("Session {}: analysis task panicked: {}", session.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                render_page(&state, &[Message::Error("Error processing file: internal error".to_string())], None),
            )
        }
    };

    session.attach(&state.secret_key, response)
}

/// GET /export - CSV of the cached report, or back to the empty state
async fn export(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = Session::from_headers(&headers, &state.secret_key);

    let Some(report) = state.store.get(&session.id) else {
        return session.attach(&state.secret_key, Redirect::to("/"));
    };

    match to_csv_bytes(&report) {
        Ok(bytes) => {
            let filename = csv_filename(&report);
            let disposition = format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                filename,
                urlencoding::encode(&filename)
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            error!("Session {}: CSV export failed: {:#}", session.id, e);
            let page = render_page(&state, &[Message::Error(format!("Export failed: {}", e))], Some(&report));
            (StatusCode::INTERNAL_SERVER_ERROR, page).into_response()
        }
    }
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/report - Cached report as JSON
async fn get_report(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = Session::from_headers(&headers, &state.secret_key);

    let response = match state.store.get(&session.id) {
        Some(report) => (StatusCode::OK, Json(ApiResponse::ok(Some(report)))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(None, "No report for this session")),
        ),
    };

    session.attach(&state.secret_key, response)
}

fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/report", get(get_report))
        .with_state(state.clone());

    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze))
        .route("/export", get(export))
        .with_state(state)
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌐 Statement Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load().context("Failed to load configuration")?;

    let analyzer = Analyzer::new(&config, Arc::new(PdfTextExtractor::new()))
        .with_context(|| format!("Failed to create upload dir: {}", config.upload_dir.display()))?;
    println!("✓ Upload dir: {}", analyzer.uploads().root().display());
    println!("✓ Parser: {} (large expense > {})", config.heuristic.name(), config.large_expense_threshold);

    let state = AppState {
        analyzer,
        store: Arc::new(InMemoryReportStore::from_config(&config)),
        secret_key: Arc::from(config.secret_key.as_str()),
    };
    println!("✓ Sessions: up to {} for {}s", config.max_sessions, config.session_ttl_secs);

    let app = build_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   UI:     /");
    println!("   Export: /export");
    println!("   API:    /api/report");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use statement_insights::{AnalysisError, Heuristic, TextExtractor};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const BOUNDARY: &str = "XyZStatementBoundary";

    struct StubExtractor {
        text: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl TextExtractor for StubExtractor {
        fn extract_text(&self, _path: &Path) -> statement_insights::error::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.text
                .map(str::to_string)
                .ok_or_else(|| AnalysisError::Extraction("EOF marker not found".to_string()))
        }
    }

    struct TestApp {
        router: Router,
        analyzer: Analyzer,
        extractor: Arc<StubExtractor>,
        store: Arc<InMemoryReportStore>,
    }

    impl Drop for TestApp {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(self.analyzer.uploads().root());
        }
    }

    fn test_app(text: Option<&'static str>) -> TestApp {
        test_app_with(text, Config::default().max_sessions)
    }

    fn test_app_with(text: Option<&'static str>, max_sessions: usize) -> TestApp {
        let config = Config {
            upload_dir: std::env::temp_dir().join(format!("insights-server-{}", uuid::Uuid::new_v4())),
            heuristic: Heuristic::Labelled,
            large_expense_threshold: 100.0,
            secret_key: "test-secret".to_string(),
            max_sessions,
            ..Config::default()
        };

        let extractor = Arc::new(StubExtractor { text, calls: AtomicUsize::new(0) });
        let analyzer = Analyzer::new(&config, extractor.clone()).unwrap();
        let store = Arc::new(InMemoryReportStore::from_config(&config));
        let state = AppState {
            analyzer: analyzer.clone(),
            store: store.clone(),
            secret_key: Arc::from(config.secret_key.as_str()),
        };

        TestApp {
            router: build_router(state, config.max_upload_bytes),
            analyzer,
            extractor,
            store,
        }
    }

    fn upload_request(field: &str, filename: &str, cookie: Option<&str>) -> Request<Body> {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             %PDF-1.4 test\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
            field = field,
            filename = filename
        );

        let mut builder = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY));
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("new session should set a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_shows_empty_state_and_sets_cookie() {
        let app = test_app(Some(""));

        let response = app.router.clone().oneshot(get_request("/", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("session="));
        let body = body_text(response).await;
        assert!(body.contains("Upload a statement to see your summary."));
        assert!(body.contains("Debit/Credit labels"));
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_rejected_without_extraction() {
        let app = test_app(Some("Debit ₹10.00"));

        let response = app
            .router
            .clone()
            .oneshot(upload_request("file", "statement.txt", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Only PDF files are allowed"));
        assert_eq!(app.extractor.calls.load(Ordering::SeqCst), 0);
        assert!(app.analyzer.uploads().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_field_and_empty_filename_are_rejected() {
        let app = test_app(Some("Debit ₹10.00"));

        let response = app
            .router
            .clone()
            .oneshot(upload_request("attachment", "statement.pdf", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("No file part"));

        let response = app
            .router
            .clone()
            .oneshot(upload_request("file", "", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("No selected file"));

        assert_eq!(app.extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_analyze_then_export_csv() {
        let app = test_app(Some("Debit ₹150.00\nCredit ₹1000.00"));

        let response = app
            .router
            .clone()
            .oneshot(upload_request("file", "march.pdf", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);

        let page = body_text(response).await;
        assert!(page.contains("₹1000.00"));
        assert!(page.contains("Most money loss comes from a few large transactions"));
        assert!(app.analyzer.uploads().is_empty().unwrap(), "upload deleted after analysis");

        let response = app
            .router
            .clone()
            .oneshot(get_request("/export", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        assert!(response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"statement_insights_"));

        let csv = body_text(response).await;
        assert_eq!(
            csv,
            "Metric,Value\n\
             Total In,₹1000.00\n\
             Total Out,₹150.00\n\
             Large Expenses count,1\n\
             Large Expenses sum,₹150.00\n\
             Small Spends count,0\n\
             Small Spends sum,₹0.00\n\
             Insight,Most money loss comes from a few large transactions\n"
        );

        let response = app
            .router
            .clone()
            .oneshot(get_request("/api/report", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["total_income"], 1000.0);
        assert_eq!(json["data"]["heuristic"], "labelled");
    }

    #[tokio::test]
    async fn test_export_without_report_redirects_home() {
        let app = test_app(Some(""));

        let response = app.router.clone().oneshot(get_request("/export", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn test_cookieless_uploads_do_not_grow_store_past_capacity() {
        let app = test_app_with(Some("Credit ₹5.00"), 3);

        for _ in 0..20 {
            let response = app
                .router
                .clone()
                .oneshot(upload_request("file", "a.pdf", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(app.store.session_count(), 3);
    }

    #[tokio::test]
    async fn test_forged_cookie_gets_a_fresh_session() {
        let app = test_app(Some("Credit ₹5.00"));

        let response = app
            .router
            .clone()
            .oneshot(upload_request("file", "a.pdf", None))
            .await
            .unwrap();
        let cookie = session_cookie(&response);
        let (id, _) = cookie.split_once('.').unwrap();
        let forged = format!("{}.{}", id, "0".repeat(64));

        let response = app
            .router
            .clone()
            .oneshot(get_request("/export", Some(&forged)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_extraction_failure_reports_error_and_cleans_up() {
        let app = test_app(None);

        let response = app
            .router
            .clone()
            .oneshot(upload_request("file", "broken.pdf", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Error processing file:"));
        assert_eq!(app.extractor.calls.load(Ordering::SeqCst), 1);
        assert!(app.analyzer.uploads().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_dollar_statement_shows_notice() {
        let app = test_app(Some("Credit $45.00\nCredit $30.00"));

        let response = app
            .router
            .clone()
            .oneshot(upload_request("file", "usd.pdf", None))
            .await
            .unwrap();

        let page = body_text(response).await;
        assert!(page.contains("Detected $ symbol. Assuming USD."));
        assert!(page.contains("No money out detected"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app(Some(""));

        let response = app.router.clone().oneshot(get_request("/api/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"success":true,"data":"OK"}"#);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>\"a\" & 'b'</script>"),
            "&lt;script&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/script&gt;"
        );
    }
}
