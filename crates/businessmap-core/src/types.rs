//! Domain types exchanged with the Businessmap API.
//!
//! Cards, comments and boards are serialized with camelCase keys; this is the
//! shape tool results carry back to callers.

use serde::{Deserialize, Serialize};

/// Default number of cards returned by a search.
pub const DEFAULT_MAX_RESULTS: u32 = 50;

/// A card on a Businessmap board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub board_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A comment attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub card_id: String,
    pub text: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// A Businessmap board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Card search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    /// Restrict the search to these boards
    pub board_ids: Option<Vec<String>>,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            board_ids: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Input for creating a card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateCardInput {
    pub board_id: String,
    pub workflow_id: String,
    pub lane_id: String,
    pub column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assignee_ids: Option<Vec<String>>,
}

/// Input for updating a card. Only fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateCardInput {
    pub card_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub column_id: Option<String>,
    pub lane_id: Option<String>,
    pub priority: Option<String>,
    pub assignee_ids: Option<Vec<String>>,
}

impl UpdateCardInput {
    /// True when no field besides the card id is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.column_id.is_none()
            && self.lane_id.is_none()
            && self.priority.is_none()
            && self.assignee_ids.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_serializes_camel_case_and_skips_missing() {
        let card = Card {
            id: "42".to_string(),
            title: "X".to_string(),
            description: None,
            board_id: "1".to_string(),
            column_id: Some("3".to_string()),
            lane_id: None,
            priority: None,
            assignee_ids: Some(vec!["7".to_string()]),
            tags: None,
            created_at: "2024-01-01".to_string(),
            updated_at: "2024-01-02".to_string(),
        };

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "42",
                "title": "X",
                "boardId": "1",
                "columnId": "3",
                "assigneeIds": ["7"],
                "createdAt": "2024-01-01",
                "updatedAt": "2024-01-02"
            })
        );
    }

    #[test]
    fn test_search_query_defaults() {
        let query = SearchQuery::new("bug");
        assert_eq!(query.max_results, 50);
        assert!(query.board_ids.is_none());
    }

    #[test]
    fn test_update_input_is_empty() {
        let mut input = UpdateCardInput {
            card_id: "1".to_string(),
            ..Default::default()
        };
        assert!(input.is_empty());

        input.priority = Some("high".to_string());
        assert!(!input.is_empty());
    }
}
