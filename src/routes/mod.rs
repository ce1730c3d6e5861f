mod admin;
mod certificates;
mod courses;
mod oauth;
mod users;
mod verify;

pub use admin::bootstrap_super_admin;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::state::AppState;
use crate::storage::MAX_VIDEO_BYTES;

// Room for the multipart framing and text fields around the video.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "OriginHash certificate service" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let verification = Router::new()
        .route("/verify", post(verify::lookup))
        .route("/verify/payment", post(verify::confirm_payment));

    let users = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", get(users::logout))
        .route("/verify/:token", get(users::verify_email))
        .route("/me/certificates", get(users::my_certificates));

    let admin = Router::new()
        .route("/login", post(admin::login))
        .route("/admins", post(admin::create_admin))
        .route("/certificates", get(certificates::list_all))
        .route("/certificates/mine", get(certificates::list_mine))
        .route("/certificates/preview", post(certificates::preview))
        .route("/certificates/issue", post(certificates::issue))
        .route("/certificates/:unique_id/bundle", get(certificates::bundle))
        .route("/course", post(courses::create_course))
        .route(
            "/course/videos",
            post(courses::upload_video)
                .layer(DefaultBodyLimit::max(MAX_VIDEO_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/course/:course_id", get(courses::get_course));

    Router::new()
        .route("/", get(health))
        .nest("/api/v1/certificates", verification)
        .nest("/api/v1/users", users)
        .nest("/api/v1/admin", admin)
        .route("/auth/google", get(oauth::google_start))
        .route("/auth/google/callback", get(oauth::google_callback))
        .nest_service("/uploads", ServeDir::new(&state.config.upload_folder))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, Role};
    use crate::certificates::{CertificatePipeline, CertificateService, PreviewJanitor};
    use crate::config::Config;
    use crate::db::MemoryCertificateStore;
    use crate::mail::LogMailer;
    use crate::render::RendererConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tempfile::TempDir;
    use testresult::TestResult;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    struct TestApp {
        router: Router,
        _dir: TempDir,
    }

    fn test_app() -> TestResult<TestApp> {
        let dir = tempfile::tempdir()?;
        let config = Arc::new(Config::for_tests(dir.path().to_path_buf()));
        // Never connected: certificate traffic goes through the in-memory store.
        let pool = PgPoolOptions::new().connect_lazy(&config.database_url)?;

        let certificates = CertificateService::new(
            Arc::new(MemoryCertificateStore::new()),
            CertificatePipeline::new(
                Arc::new(RendererConfig::discover()?),
                config.upload_folder.clone(),
            ),
            Arc::new(LogMailer),
            PreviewJanitor::new(),
            Duration::from_secs(300),
            format!("{}/verify", config.frontend_url),
        );
        let state = Arc::new(AppState {
            pool: Arc::new(pool),
            config,
            certificates,
            google: None,
        });

        Ok(TestApp {
            router: router(state),
            _dir: dir,
        })
    }

    fn bearer(id: i32, role: Role, name: &str) -> String {
        let token = issue_token(SECRET, id, role, name).expect("sign test token");
        format!("Bearer {token}")
    }

    fn admin() -> String {
        bearer(1, Role::Admin, "registrar")
    }

    fn student() -> String {
        bearer(9, Role::Individual, "ada@example.com")
    }

    fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    fn get_with(uri: &str, auth: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .expect("valid request")
    }

    async fn send(app: &TestApp, request: Request<Body>) -> TestResult<(StatusCode, Value)> {
        let response = app.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    fn ada() -> Value {
        json!({
            "studentEmail": "ada@example.com",
            "studentName": "Ada Lovelace",
            "courseName": "Intro to Algorithms",
            "issueDate": "2024-01-01",
            "expiryDate": "2025-01-01",
        })
    }

    async fn issue_ada(app: &TestApp) -> TestResult<Value> {
        let (status, body) = send(
            app,
            post_json("/api/v1/admin/certificates/issue", Some(&admin()), ada()),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        Ok(body["certificate"].clone())
    }

    #[tokio::test]
    async fn verification_requires_a_session() -> TestResult {
        let app = test_app()?;

        let (status, body) = send(
            &app,
            post_json("/api/v1/certificates/verify", None, json!({ "uniqueId": "x" })),
        )
        .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_certificate_is_404() -> TestResult {
        let app = test_app()?;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/certificates/verify",
                Some(&student()),
                json!({ "uniqueId": "does-not-exist" }),
            ),
        )
        .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Certificate not found" }));
        Ok(())
    }

    #[tokio::test]
    async fn issue_lookup_and_pay() -> TestResult {
        let app = test_app()?;
        let certificate = issue_ada(&app).await?;
        let unique_id = certificate["uniqueId"].as_str().unwrap_or_default().to_string();

        assert_eq!(certificate["studentName"], "Ada Lovelace");
        assert_eq!(certificate["issueDate"], "2024-01-01");
        assert_eq!(certificate["verified"], false);
        assert_eq!(
            certificate["pngUrl"],
            format!("/uploads/cert-{unique_id}.png")
        );
        assert_eq!(certificate["hash"].as_str().map(str::len), Some(64));

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/certificates/verify",
                Some(&student()),
                json!({ "uniqueId": unique_id }),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cert"]["courseName"], "Intro to Algorithms");
        assert_eq!(body["cert"]["verified"], false);

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/certificates/verify/payment",
                Some(&student()),
                json!({ "uniqueId": unique_id, "paymentDetails": { "cardName": "Ada" } }),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cert"]["verified"], true);
        assert_eq!(body["cert"]["paymentDetails"], json!({ "cardName": "Ada" }));

        let (_, body) = send(
            &app,
            post_json(
                "/api/v1/certificates/verify",
                Some(&student()),
                json!({ "uniqueId": unique_id }),
            ),
        )
        .await?;
        assert_eq!(body["cert"]["verified"], true);
        assert!(body["cert"].get("paymentDetails").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn issuing_requires_an_admin() -> TestResult {
        let app = test_app()?;

        let (status, _) = send(
            &app,
            post_json("/api/v1/admin/certificates/issue", Some(&student()), ada()),
        )
        .await?;

        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn missing_field_is_a_bad_request() -> TestResult {
        let app = test_app()?;
        let mut form = ada();
        form["courseName"] = json!("");

        let (status, body) = send(
            &app,
            post_json("/api/v1/admin/certificates/issue", Some(&admin()), form),
        )
        .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "courseName is required");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() -> TestResult {
        let app = test_app()?;
        let request = Request::post("/api/v1/admin/certificates/issue")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, admin())
            .body(Body::from("{not json"))?;

        let (status, body) = send(&app, request).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Malformed payload");
        Ok(())
    }

    #[tokio::test]
    async fn preview_links_carry_a_token() -> TestResult {
        let app = test_app()?;

        let (status, body) = send(
            &app,
            post_json("/api/v1/admin/certificates/preview", Some(&admin()), ada()),
        )
        .await?;

        assert_eq!(status, StatusCode::OK);
        let link = body["previewLink"].as_str().unwrap_or_default();
        assert!(link.starts_with("/uploads/preview-"));
        assert!(link.contains(".png?token="));
        assert!(body["pdfPreview"].as_str().unwrap_or_default().ends_with(".pdf"));
        assert!(body["previewId"].is_string());

        let (_, listed) = send(
            &app,
            get_with("/api/v1/admin/certificates", &bearer(2, Role::SuperAdmin, "root")),
        )
        .await?;
        assert_eq!(listed["count"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn listing_everything_needs_super_admin() -> TestResult {
        let app = test_app()?;
        issue_ada(&app).await?;

        let (status, _) = send(&app, get_with("/api/v1/admin/certificates", &admin())).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            get_with("/api/v1/admin/certificates", &bearer(2, Role::SuperAdmin, "root")),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (_, mine) = send(&app, get_with("/api/v1/admin/certificates/mine", &admin())).await?;
        assert_eq!(mine["count"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn students_see_their_own_certificates() -> TestResult {
        let app = test_app()?;
        issue_ada(&app).await?;

        let (status, body) = send(&app, get_with("/api/v1/users/me/certificates", &student())).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["certificates"][0]["studentEmail"], "ada@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn bundle_zips_both_artifacts() -> TestResult {
        let app = test_app()?;
        let certificate = issue_ada(&app).await?;
        let unique_id = certificate["uniqueId"].as_str().unwrap_or_default();

        let response = app
            .router
            .clone()
            .oneshot(get_with(
                &format!("/api/v1/admin/certificates/{unique_id}/bundle"),
                &admin(),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        let bytes = response.into_body().collect().await?.to_bytes().to_vec();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
        assert_eq!(archive.len(), 2);
        assert!(archive.by_name(&format!("cert-{unique_id}.pdf")).is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn another_admins_bundle_is_forbidden() -> TestResult {
        let app = test_app()?;
        let certificate = issue_ada(&app).await?;
        let unique_id = certificate["uniqueId"].as_str().unwrap_or_default();

        let (status, _) = send(
            &app,
            get_with(
                &format!("/api/v1/admin/certificates/{unique_id}/bundle"),
                &bearer(5, Role::Admin, "other"),
            ),
        )
        .await?;

        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn issued_png_is_served_from_uploads() -> TestResult {
        let app = test_app()?;
        let certificate = issue_ada(&app).await?;
        let url = certificate["pngUrl"].as_str().unwrap_or_default().to_string();

        let response = app
            .router
            .clone()
            .oneshot(Request::get(url.as_str()).body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        Ok(())
    }

    #[tokio::test]
    async fn google_sign_in_is_404_when_unconfigured() -> TestResult {
        let app = test_app()?;

        let (status, _) = send(
            &app,
            Request::get("/auth/google").body(Body::empty())?,
        )
        .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() -> TestResult {
        let app = test_app()?;

        let response = app
            .router
            .clone()
            .oneshot(get_with("/api/v1/users/logout", &student()))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with("token="));
        Ok(())
    }
}
