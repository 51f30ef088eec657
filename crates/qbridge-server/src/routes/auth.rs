//! Authorization endpoints: start (redirect to provider) and callback.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Query parameters sent by the provider to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "realmId")]
    pub realm_id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Body returned after a successful callback.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub message: String,
    pub realm_id: String,
}

/// GET /auth/start: redirect the user agent to the provider.
pub async fn auth_start_handler(State(state): State<AppState>) -> Response {
    let start = state.broker().start_authorization().await;
    (StatusCode::FOUND, [(header::LOCATION, start.url)]).into_response()
}

/// GET /callback: validate state, exchange the code, store the tokens.
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    if let Some(error) = params.error {
        let detail = params
            .error_description
            .map(|d| format!("{}: {}", error, d))
            .unwrap_or(error);
        return Err(ServerError::BadRequest(format!(
            "Authorization was not granted ({})",
            detail
        )));
    }

    let code = required(params.code, "code")?;
    let auth_state = required(params.state, "state")?;
    let realm_id = required(params.realm_id, "realmId")?;

    state
        .broker()
        .complete_authorization(&code, &auth_state, &realm_id)
        .await?;

    Ok(Json(CallbackResponse {
        message: "Authorization complete. Tokens stored.".to_string(),
        realm_id,
    }))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("Missing query parameter '{}'", name)))
}

/// Create authorization routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/start", get(auth_start_handler))
        .route("/callback", get(callback_handler))
}
