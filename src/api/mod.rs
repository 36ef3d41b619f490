use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::WeatherReading;
use crate::store::WeatherStore;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn WeatherStore>,
}

/// JSON error envelope: `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler failure rendered as a status code plus [`ErrorBody`]
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(store: Arc<dyn WeatherStore>) -> Router {
    Router::new()
        .route(
            "/weather/latest",
            get(get_latest).head(|| async { StatusCode::METHOD_NOT_ALLOWED }),
        )
        .with_state(AppState { store })
}

async fn get_latest(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<WeatherReading>, ApiError> {
    let Query(params) =
        query.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;

    // first value wins when the parameter is repeated
    let location = params
        .iter()
        .find(|(key, _)| key == "location")
        .map(|(_, value)| value.as_str());
    let location = match location {
        Some(name) if !name.is_empty() => name,
        _ => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "missing required query param: location",
            ));
        }
    };

    let reading = state.store.get_latest(location).await.map_err(|e| {
        warn!(location, "get latest failed: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(reading))
}
