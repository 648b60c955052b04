use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    routing::post,
    Form, Json, Router,
};
use printbuddy_core::Submission;
use serde_json::{json, Value};

use super::AppState;
use crate::error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/feedback", post(create_feedback))
}

/// Body encodings accepted for feedback.
enum BodyKind {
    Json,
    Form,
    Missing,
    Unsupported(String),
}

fn body_kind(req: &Request) -> BodyKind {
    let Some(value) = req.headers().get(CONTENT_TYPE) else {
        return BodyKind::Missing;
    };
    let essence = value
        .to_str()
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/json" => BodyKind::Json,
        "application/x-www-form-urlencoded" => BodyKind::Form,
        other => BodyKind::Unsupported(other.to_string()),
    }
}

/// Decode a JSON or urlencoded body into a submission. A request without
/// a content type is treated as an empty submission.
async fn read_submission(req: Request) -> Result<Submission, ApiError> {
    match body_kind(&req) {
        BodyKind::Json => {
            let Json(body) = Json::<Value>::from_request(req, &())
                .await
                .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
            Submission::from_json(body).map_err(|e| ApiError::BadRequest(e.message().to_string()))
        }
        BodyKind::Form => {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, &())
                .await
                .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
            Ok(pairs.into_iter().collect())
        }
        BodyKind::Missing => Ok(Submission::new()),
        BodyKind::Unsupported(kind) => Err(ApiError::UnsupportedMediaType(format!(
            "Unsupported content type {kind:?}; send JSON or a urlencoded form"
        ))),
    }
}

async fn create_feedback(
    State(state): State<AppState>,
    req: Request,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let submission = read_submission(req).await?;
    state.intake.submit_feedback(&submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Feedback submitted successfully" })),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Method;
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::test_helpers::{
        response_json, test_app, test_app_with, RecordingNotifier, RejectingDatabase,
        TestApp, TestBackends,
    };

    use super::*;

    fn app() -> TestApp {
        test_app(Arc::new(RecordingNotifier::default()), ServerConfig::default())
    }

    fn post_feedback(content_type: &str, body: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/api/feedback")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn json_feedback_is_created() {
        let app = app();
        let resp = app
            .router
            .clone()
            .oneshot(post_feedback(
                "application/json",
                r#"{"feedback":"Great service","rating":5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let v = response_json(resp).await;
        assert_eq!(v["message"], "Feedback submitted successfully");

        let stored = app.db.list_feedback(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rating, 5);
        assert_eq!(stored[0].feedback, "Great service");
    }

    #[tokio::test]
    async fn form_feedback_is_created() {
        let app = app();
        let resp = app
            .router
            .clone()
            .oneshot(post_feedback(
                "application/x-www-form-urlencoded",
                "name=Asha&feedback=Quick+turnaround&rating=4",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let stored = app.db.list_feedback(10).await.unwrap();
        assert_eq!(stored[0].name.as_deref(), Some("Asha"));
        assert_eq!(stored[0].feedback, "Quick turnaround");
        assert_eq!(stored[0].rating, 4);
    }

    #[tokio::test]
    async fn empty_feedback_is_rejected() {
        let app = app();
        let resp = app
            .router
            .clone()
            .oneshot(post_feedback(
                "application/json",
                r#"{"feedback":"","rating":5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = response_json(resp).await;
        assert_eq!(v["message"], "Feedback is required");
        assert_eq!(app.db.count_feedback().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn out_of_range_ratings_are_rejected() {
        let app = app();
        for rating in ["0", "6", "\"five\"", "4.5", "null"] {
            let body = format!(r#"{{"feedback":"ok","rating":{rating}}}"#);
            let resp = app
                .router
                .clone()
                .oneshot(post_feedback("application/json", &body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "rating={rating}");
            let v = response_json(resp).await;
            assert_eq!(v["message"], "Rating must be between 1 and 5");
        }
        assert_eq!(app.db.count_feedback().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persist_failure_is_a_500() {
        let app = test_app_with(
            Arc::new(RecordingNotifier::default()),
            ServerConfig::default(),
            TestBackends {
                db: Some(Arc::new(RejectingDatabase::default())),
                ..Default::default()
            },
        );
        let resp = app
            .router
            .clone()
            .oneshot(post_feedback(
                "application/json",
                r#"{"feedback":"Great service","rating":5}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response_json(resp).await["message"], "Server error");
        assert_eq!(app.db.count_feedback().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = app();
        let resp = app
            .router
            .clone()
            .oneshot(post_feedback("application/json", "{not json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(response_json(resp).await["message"].is_string());
    }

    #[tokio::test]
    async fn unsupported_content_type_is_415() {
        let app = app();
        let resp = app
            .router
            .clone()
            .oneshot(post_feedback("text/plain", "Great service"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(app.db.count_feedback().await.unwrap(), 0);
    }
}
