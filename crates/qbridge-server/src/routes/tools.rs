//! Tool discovery and dispatch for external tool-calling clients.
//!
//! `GET /tools/discover` advertises `search` and `fetch` with their input
//! schemas; `POST /tools/execute` runs one of them for a tenant and answers
//! with a list of text content blocks.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use qbridge_oauth::Entity;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// A callable operation advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Response of `GET /tools/discover`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub tools: Vec<ToolDescriptor>,
}

/// Body of `POST /tools/execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub endpoint: String,
    #[serde(default)]
    pub parameters: Value,
    /// Tenant (realm) id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Same as `user_id`; used when `user_id` is absent.
    #[serde(default)]
    pub realm_id: Option<String>,
    /// Same as `user_id`; used when `user_id` and `realm_id` are absent.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// State of a completed authorization, as an alternative to `user_id`.
    #[serde(default)]
    pub state: Option<String>,
}

impl ExecuteRequest {
    /// The explicitly addressed tenant, `user_id` first.
    fn explicit_tenant(&self) -> Option<&str> {
        [&self.user_id, &self.realm_id, &self.tenant_id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|id| !id.is_empty())
    }
}

/// One content block of a tool result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Response of `POST /tools/execute`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub content: Vec<ContentBlock>,
}

impl ExecuteResponse {
    fn text(text: String) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    entity: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    entity: String,
    id: String,
}

/// The tools this server exposes.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let entities: Vec<&str> = Entity::ALL.iter().map(|e| e.name()).collect();

    vec![
        ToolDescriptor {
            name: "search".to_string(),
            description: "Search accounting records by name or number. Matches are \
                          case-sensitive substrings; at most 10 results are returned."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "entity": {
                        "type": "string",
                        "enum": entities,
                        "description": "Kind of record to search"
                    },
                    "query": {
                        "type": "string",
                        "description": "Text the record's name or number must contain"
                    }
                },
                "required": ["entity", "query"]
            }),
        },
        ToolDescriptor {
            name: "fetch".to_string(),
            description: "Fetch a single accounting record by id.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "entity": {
                        "type": "string",
                        "enum": entities,
                        "description": "Kind of record to fetch"
                    },
                    "id": {
                        "type": "string",
                        "description": "Record id"
                    }
                },
                "required": ["entity", "id"]
            }),
        },
    ]
}

/// GET /tools/discover
pub async fn discover_handler() -> Json<DiscoverResponse> {
    Json(DiscoverResponse {
        tools: tool_descriptors(),
    })
}

/// POST /tools/execute
pub async fn execute_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>> {
    let Json(request) = payload?;
    let user_id = request.explicit_tenant().map(str::to_string);
    let ExecuteRequest {
        endpoint,
        parameters,
        state: session,
        ..
    } = request;

    let text = match endpoint.as_str() {
        "search" => {
            let params: SearchParams = parse_params(parameters)?;
            let entity: Entity = params.entity.parse()?;
            let tenant_id = state
                .broker()
                .resolve_tenant(user_id.as_deref(), session.as_deref())
                .await?;

            tracing::info!(tenant_id = %tenant_id, entity = %entity, "Executing search");
            state
                .api
                .search(&tenant_id, entity, &params.query)
                .await?
                .to_text()
        }
        "fetch" => {
            let params: FetchParams = parse_params(parameters)?;
            let entity: Entity = params.entity.parse()?;
            let tenant_id = state
                .broker()
                .resolve_tenant(user_id.as_deref(), session.as_deref())
                .await?;

            tracing::info!(tenant_id = %tenant_id, entity = %entity, "Executing fetch");
            let record = state.api.fetch(&tenant_id, entity, &params.id).await?;
            serde_json::to_string_pretty(&record)
                .map_err(|e| ServerError::Internal(format!("Failed to render record: {}", e)))?
        }
        other => return Err(ServerError::UnknownTool(other.to_string())),
    };

    Ok(Json(ExecuteResponse::text(text)))
}

fn parse_params<T: serde::de::DeserializeOwned>(parameters: Value) -> Result<T> {
    serde_json::from_value(parameters)
        .map_err(|e| ServerError::BadRequest(format!("Invalid parameters: {}", e)))
}

/// Create tool routes.
pub fn tool_routes() -> Router<AppState> {
    Router::new()
        .route("/tools/discover", get(discover_handler))
        .route("/tools/execute", post(execute_handler))
}
