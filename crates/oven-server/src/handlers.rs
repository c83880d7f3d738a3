//! The single installer endpoint
//!
//! One URL, POST only, form-encoded body with an `action` field. Every
//! response is HTTP 200; failure is signaled via the JSON `success` flag,
//! so clients never inspect status codes.

use crate::state::AppState;
use axum::extract::{Form, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use oven_core::composer::locate;
use oven_core::error::Result;
use oven_core::{checks, composer, db, project, InstallError, InstallRequest, Step};
use serde::Serialize;

/// Wire response for every action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}

/// Successful action payload before the `success` flag is attached.
#[derive(Debug, Default)]
struct Outcome {
    message: String,
    log: Option<String>,
    steps: Option<Vec<Step>>,
}

impl Outcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(dispatch))
        .route("/health", get(health))
        .with_state(state)
}

/// Liveness plus the discovered system-wide Composer, which clients may
/// offer as the default `composerPath`.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "composerSystemPath": locate::system_path(&state.composer_filename),
    }))
}

async fn dispatch(
    State(state): State<AppState>,
    Form(req): Form<InstallRequest>,
) -> Json<ActionResponse> {
    tracing::info!(action = %req.action, dir = %req.dir, "handling action");

    Json(match run_action(&state, &req).await {
        Ok(outcome) => ActionResponse {
            success: 1,
            message: outcome.message,
            log: outcome.log,
            steps: outcome.steps,
        },
        Err(err) => {
            tracing::warn!(action = %req.action, error = %err, "action failed");
            let (message, log) = err.into_parts();
            ActionResponse {
                success: 0,
                message,
                log,
                steps: None,
            }
        }
    })
}

async fn run_action(state: &AppState, req: &InstallRequest) -> Result<Outcome> {
    match req.action.as_str() {
        "checkPhp" => Ok(Outcome::message(checks::check_php().await?)),
        "checkMbString" => Ok(Outcome::message(checks::check_mb_string().await?)),
        "checkOpenSSL" => Ok(Outcome::message(checks::check_openssl().await?)),
        "checkIntl" => Ok(Outcome::message(checks::check_intl().await?)),
        "checkPath" => Ok(Outcome::message(
            checks::check_path(&req.install_dir(&state.base_dir)).await?,
        )),
        "installComposer" => {
            let composer = state.composer(req)?;
            let (message, log) = composer::provision(
                &state.client,
                composer.bin(),
                &state.base_dir,
                &state.composer_filename,
                &state.composer_home,
            )
            .await?;

            Ok(Outcome {
                message,
                log: Some(log),
                steps: None,
            })
        }
        "createProject" => {
            let composer = state.composer(req)?;
            let catalog = state.catalog().await;
            let outcome =
                project::create_project(&composer, &state.base_dir, req, &catalog).await?;

            Ok(Outcome {
                message: "CakePHP project created".to_string(),
                log: Some(outcome.log),
                steps: Some(outcome.steps),
            })
        }
        "installPackage" => {
            let composer = state.composer(req)?;
            let log = project::install_package(&composer, &state.base_dir, req).await?;

            Ok(Outcome {
                message: format!(
                    "{}:{} installed",
                    req.package.as_deref().unwrap_or_default(),
                    req.version.as_deref().unwrap_or_default()
                ),
                log: Some(log),
                steps: None,
            })
        }
        "finalise" => {
            let composer = state.composer(req)?;
            let log = project::finalise(&composer, &state.base_dir, req).await?;

            Ok(Outcome {
                message: "Finalised!".to_string(),
                log: Some(log),
                steps: None,
            })
        }
        "checkDatabaseConnection" => Ok(Outcome::message(db::check_connection(req).await?)),
        other => Err(InstallError::precondition(format!(
            "Unknown action {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use oven_core::catalog;
    use tower::ServiceExt;

    fn test_state(base_dir: &std::path::Path) -> AppState {
        AppState::new(
            base_dir.to_path_buf(),
            "composer.phar".to_string(),
            catalog::PACKAGE_INDEX_URL.to_string(),
        )
    }

    async fn post_action(state: AppState, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_check_path_on_creatable_directory() {
        let base = tempfile::tempdir().unwrap();
        let (status, json) = post_action(test_state(base.path()), "action=checkPath&dir=missing").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], 1);
        assert_eq!(
            json["message"],
            format!("{} directory is writable", base.path().join("missing").display())
        );
    }

    #[tokio::test]
    async fn test_install_package_outside_allowed_set() {
        let base = tempfile::tempdir().unwrap();
        let app = base.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(
            app.join("composer.json.bak"),
            r#"{"require": {"cakephp/cakephp": "3.5.*"}, "require-dev": {}}"#,
        )
        .unwrap();

        let (status, json) = post_action(
            test_state(base.path()),
            "action=installPackage&package=not%2Fallowed&version=1.0&dir=app",
        )
        .await;

        // Failure still answers 200; only the success flag signals it.
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], 0);
        assert_eq!(json["message"], "not/allowed package is not allowed");
    }

    #[tokio::test]
    async fn test_check_database_connection_missing_host() {
        let base = tempfile::tempdir().unwrap();
        let (status, json) = post_action(
            test_state(base.path()),
            "action=checkDatabaseConnection&database=app&username=root",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], 0);
        assert_eq!(json["message"], "Missing database host");
    }

    #[tokio::test]
    async fn test_unknown_action_fails() {
        let base = tempfile::tempdir().unwrap();
        let (_, json) = post_action(test_state(base.path()), "action=nuke").await;

        assert_eq!(json["success"], 0);
        assert_eq!(json["message"], "Unknown action nuke");
    }

    #[tokio::test]
    async fn test_health_route() {
        let base = tempfile::tempdir().unwrap();
        let response = router(test_state(base.path()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
