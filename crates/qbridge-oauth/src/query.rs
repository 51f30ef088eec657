//! Read helpers over the accounting API: entity search and fetch-by-id.
//!
//! Queries are assembled with [`Query`], which quotes and escapes every
//! literal so caller text cannot alter the statement.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::api::ApiClient;
use crate::error::{OAuthError, Result};

/// Maximum number of rows included in a search result.
pub const DISPLAY_LIMIT: usize = 10;

/// Entity kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Customer,
    Invoice,
    Payment,
    Item,
}

impl Entity {
    pub const ALL: [Entity; 4] = [
        Entity::Customer,
        Entity::Invoice,
        Entity::Payment,
        Entity::Item,
    ];

    /// Lowercase name used in paths and tool parameters.
    pub fn name(&self) -> &'static str {
        match self {
            Entity::Customer => "customer",
            Entity::Invoice => "invoice",
            Entity::Payment => "payment",
            Entity::Item => "item",
        }
    }

    /// Table name in the query language and key in API responses.
    pub fn table(&self) -> &'static str {
        match self {
            Entity::Customer => "Customer",
            Entity::Invoice => "Invoice",
            Entity::Payment => "Payment",
            Entity::Item => "Item",
        }
    }

    /// Fields selected by [`search`](ApiClient::search).
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Entity::Customer => &["Id", "DisplayName", "CompanyName", "PrimaryEmailAddr", "Balance"],
            Entity::Invoice => &["Id", "DocNumber", "TxnDate", "CustomerRef", "TotalAmt", "Balance"],
            Entity::Payment => &["Id", "TxnDate", "CustomerRef", "TotalAmt", "PaymentRefNum"],
            Entity::Item => &["Id", "Name", "Type", "UnitPrice", "QtyOnHand"],
        }
    }

    /// Field the search text is matched against.
    pub fn search_field(&self) -> &'static str {
        match self {
            Entity::Customer => "DisplayName",
            Entity::Invoice => "DocNumber",
            Entity::Payment => "PaymentRefNum",
            Entity::Item => "Name",
        }
    }

    /// Query selecting rows whose search field contains `text`.
    pub fn search_query(&self, text: &str) -> Query {
        Query::select(self.fields())
            .from(self.table())
            .where_contains(self.search_field(), text)
    }

    /// Case-sensitive substring match of `text` against the row's search field.
    pub fn matches(&self, row: &Value, text: &str) -> bool {
        row.get(self.search_field())
            .and_then(Value::as_str)
            .is_some_and(|value| value.contains(text))
    }

    /// One-line rendering of a row using the selected fields.
    pub fn summarize(&self, row: &Value) -> String {
        self.fields()
            .iter()
            .filter_map(|field| {
                row.get(*field)
                    .and_then(display_value)
                    .map(|v| format!("{}: {}", field, v))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Entity {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self> {
        Entity::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OAuthError::InvalidEntity(s.to_string()))
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Reference types ({value, name}) and e-mail addresses ({Address}).
        Value::Object(map) => ["name", "Address", "value"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        Value::Array(_) => Some(value.to_string()),
    }
}

// ============================================================================
// Query builder
// ============================================================================

/// A `SELECT` statement in the provider's query language.
///
/// Field and table names are `'static` identifiers chosen by this crate;
/// only literal values come from callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    fields: Vec<&'static str>,
    table: &'static str,
    contains: Vec<(&'static str, String)>,
}

impl Query {
    /// Start a query selecting `fields`.
    pub fn select(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
            table: "",
            contains: Vec::new(),
        }
    }

    /// Set the table.
    pub fn from(mut self, table: &'static str) -> Self {
        self.table = table;
        self
    }

    /// Require `field` to contain `value`.
    pub fn where_contains(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.contains.push((field, value.into()));
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields.join(", ")
        };
        write!(f, "SELECT {} FROM {}", fields, self.table)?;

        for (i, (field, value)) in self.contains.iter().enumerate() {
            f.write_str(if i == 0 { " WHERE " } else { " AND " })?;
            write!(f, "{} LIKE '%{}%'", field, escape_like_literal(value))?;
        }
        Ok(())
    }
}

/// Escape a value for use inside a single-quoted `LIKE` pattern.
fn escape_like_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '\'' => {
                out.push('\\');
                out.push(c);
            }
            '%' => out.push_str("\\%"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// Search / fetch
// ============================================================================

/// Rows returned by a search, truncated for display.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub entity: Entity,
    pub query: String,
    /// Matching rows before truncation.
    pub total: usize,
    pub rows: Vec<Value>,
}

impl SearchResults {
    /// Human-readable listing of the results.
    pub fn to_text(&self) -> String {
        if self.rows.is_empty() {
            return format!("No {} records found.", self.entity);
        }

        let mut text = if self.total > self.rows.len() {
            format!(
                "Found {} {} records (showing first {}):",
                self.total,
                self.entity,
                self.rows.len()
            )
        } else {
            format!("Found {} {} records:", self.total, self.entity)
        };
        for row in &self.rows {
            text.push_str("\n- ");
            text.push_str(&self.entity.summarize(row));
        }
        text
    }
}

impl ApiClient {
    /// Search `entity` records whose search field contains `text`.
    ///
    /// The provider's `LIKE` ignores case, so rows are filtered again locally
    /// with a case-sensitive match before truncation to [`DISPLAY_LIMIT`].
    pub async fn search(&self, tenant_id: &str, entity: Entity, text: &str) -> Result<SearchResults> {
        let query = entity.search_query(text).to_string();
        tracing::debug!(tenant_id = %tenant_id, entity = %entity, "Running search query");

        let body = self.get(tenant_id, "query", &[("query", query.as_str())]).await?;

        let rows: Vec<Value> = body
            .get("QueryResponse")
            .and_then(|r| r.get(entity.table()))
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter(|row| entity.matches(row, text))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let total = rows.len();
        Ok(SearchResults {
            entity,
            query,
            total,
            rows: rows.into_iter().take(DISPLAY_LIMIT).collect(),
        })
    }

    /// Fetch one record by id, unwrapped from its entity key.
    pub async fn fetch(&self, tenant_id: &str, entity: Entity, id: &str) -> Result<Value> {
        let id = id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(OAuthError::InvalidRequest(format!(
                "Invalid {} id: '{}'",
                entity, id
            )));
        }

        let mut body = self
            .get(tenant_id, &format!("{}/{}", entity.name(), id), &[])
            .await?;

        body.get_mut(entity.table())
            .map(Value::take)
            .ok_or_else(|| {
                OAuthError::Serialization(format!("Response has no '{}' object", entity.table()))
            })
    }
}
