//! Businessmap API payload types.
//!
//! These types represent the raw JSON exchanged with the Businessmap API v2.
//! Responses are deserialized and then mapped to the core types.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Scalars
// =============================================================================

/// Identifier that the API may send either as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ApiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiId::Number(n) => write!(f, "{}", n),
            ApiId::Text(s) => f.write_str(s),
        }
    }
}

/// Wrapper used by list endpoints: `{ "data": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

// =============================================================================
// Cards
// =============================================================================

/// Card as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCard {
    #[serde(alias = "card_id")]
    pub id: ApiId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub board_id: ApiId,
    #[serde(default)]
    pub column_id: Option<ApiId>,
    #[serde(default)]
    pub lane_id: Option<ApiId>,
    #[serde(default)]
    pub priority: Option<ApiId>,
    #[serde(default)]
    pub assignee_ids: Option<Vec<ApiId>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body for `POST /cards`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCardRequest {
    pub board_id: String,
    pub workflow_id: String,
    pub lane_id: String,
    pub column_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,
}

/// Body for `PATCH /cards/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCardRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,
}

// =============================================================================
// Comments
// =============================================================================

/// Comment as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiComment {
    #[serde(alias = "comment_id")]
    pub id: ApiId,
    pub card_id: ApiId,
    #[serde(default)]
    pub text: String,
    pub author_id: ApiId,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for `POST /cards/{id}/comments`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

// =============================================================================
// Boards
// =============================================================================

/// Board as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiBoard {
    #[serde(alias = "board_id")]
    pub id: ApiId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
