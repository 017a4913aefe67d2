//! HTTP adapter over [`PredictionService`].

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::error::DelayError;
use crate::service::PredictionService;
use crate::types::{PredictResponse, PredictionRequest};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(state)
}

// ---------- Errors ----------

#[derive(Debug)]
pub enum ApiError {
    Delay(DelayError),
    /// Request body was not a valid `{ "flights": [...] }` document.
    BadRequest(String),
}

impl From<DelayError> for ApiError {
    fn from(e: DelayError) -> Self {
        Self::Delay(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn status_for(error: &DelayError) -> StatusCode {
    match error {
        DelayError::Validation(_) => StatusCode::BAD_REQUEST,
        DelayError::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DelayError::ModelNotLoaded | DelayError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        DelayError::ShapeMismatch(_) | DelayError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "status": StatusCode::BAD_REQUEST.as_u16() }),
            ),
            ApiError::Delay(DelayError::Validation(e)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": e.to_string(),
                    "field": e.field,
                    "index": e.index,
                    "status": StatusCode::BAD_REQUEST.as_u16(),
                }),
            ),
            ApiError::Delay(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    tracing::error!(error = %e, "prediction failed");
                }
                (status, json!({ "error": e.to_string(), "status": status.as_u16() }))
            }
        };
        (status, Json(body)).into_response()
    }
}

// ---------- Handlers ----------

async fn index() -> Json<serde_json::Value> {
    Json(json!({ "message": "Flight delay prediction service" }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "model_loaded": state.service.classifier().is_loaded(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.predict_response(&request.flights)?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureSchema;
    use crate::error::{ShapeMismatchError, StoreError};
    use crate::model::DelayClassifier;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app_without_model() -> Router {
        let svc = PredictionService::new(FeatureSchema::default(), Arc::new(DelayClassifier::new())).unwrap();
        router(AppState::new(svc))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_status_and_model_presence() {
        let resp = app_without_model()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let resp = app_without_model()
            .oneshot(
                Request::post("/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"flights": [{"OPERA": "Grupo LATAM"}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validation_runs_before_model_lookup() {
        let resp = app_without_model()
            .oneshot(
                Request::post("/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"flights": [{"OPERA": "Aerolineas Argentinas", "TIPOVUELO": "N", "MES": 13}]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["field"], "MES");
        assert_eq!(body["index"], 0);
    }

    #[tokio::test]
    async fn missing_model_is_service_unavailable() {
        let resp = app_without_model()
            .oneshot(
                Request::post("/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"flights": [{"OPERA": "Aerolineas Argentinas", "TIPOVUELO": "N", "MES": 3}]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["status"], 503);
    }

    #[test]
    fn error_classes_map_to_statuses() {
        let shape = DelayError::ShapeMismatch(ShapeMismatchError {
            expected: vec!["a".into()],
            found: vec!["b".into()],
        });
        assert_eq!(status_for(&shape), StatusCode::INTERNAL_SERVER_ERROR);
        let store = DelayError::Store(StoreError::NotFound {
            location: "models/model.json".into(),
        });
        assert_eq!(status_for(&store), StatusCode::SERVICE_UNAVAILABLE);
        let data = DelayError::Data(crate::error::DataError::EmptyDataset);
        assert_eq!(status_for(&data), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
