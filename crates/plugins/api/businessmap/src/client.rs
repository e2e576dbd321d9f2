//! Businessmap API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use businessmap_core::{
    Board, BusinessmapConfig, Card, Comment, CreateCardInput, Error, Gateway, Result, SearchQuery,
    UpdateCardInput,
};
use tracing::{debug, warn};

use crate::text::clean_text;
use crate::types::{
    ApiBoard, ApiCard, ApiComment, ApiId, ApiList, CreateCardRequest, CreateCommentRequest,
    UpdateCardRequest,
};
use crate::API_PREFIX;

/// Client-level timeout for a single HTTP request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Businessmap API client.
pub struct BusinessmapClient {
    base_url: String,
    api_key: String,
    boards_filter: Option<Vec<String>>,
    client: reqwest::Client,
}

impl BusinessmapClient {
    /// Create a new client for `base_url` (e.g. `https://acme.kanbanize.com`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), api_key.into(), true)
    }

    /// Create a client from validated configuration.
    pub fn from_config(config: &BusinessmapConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| Error::Config("Businessmap URL is not configured".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("Businessmap API key is not configured".to_string()))?;

        let client = Self::build(url, api_key, config.ssl_verify)?;
        Ok(match &config.boards_filter {
            Some(boards) => client.with_boards_filter(boards.clone()),
            None => client,
        })
    }

    fn build(base_url: String, api_key: String, ssl_verify: bool) -> Result<Self> {
        if !ssl_verify {
            warn!("TLS certificate verification is disabled");
        }

        let client = reqwest::Client::builder()
            .user_agent("businessmap-mcp")
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!ssl_verify)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            boards_filter: None,
            client,
        })
    }

    /// Only expose cards and boards belonging to these board IDs.
    pub fn with_boards_filter(mut self, boards: Vec<String>) -> Self {
        self.boards_filter = (!boards.is_empty()).then_some(boards);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn board_allowed(&self, board_id: &str) -> bool {
        match &self.boards_filter {
            Some(boards) => boards.iter().any(|b| b == board_id),
            None => true,
        }
    }

    /// Build request with common headers.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Content-Type", "application/json")
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(e.to_string())
            } else {
                Error::Http(e.to_string())
            }
        })
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = url, "Businessmap GET request");

        let response = self
            .send(self.request(reqwest::Method::GET, url).query(query))
            .await?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "Businessmap POST request");

        let response = self
            .send(self.request(reqwest::Method::POST, url).json(body))
            .await?;

        self.handle_response(response).await
    }

    /// Make an authenticated PATCH request.
    async fn patch<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "Businessmap PATCH request");

        let response = self
            .send(self.request(reqwest::Method::PATCH, url).json(body))
            .await?;

        self.handle_response(response).await
    }

    /// Make an authenticated DELETE request.
    async fn delete(&self, url: &str) -> Result<()> {
        debug!(url = url, "Businessmap DELETE request");

        let response = self
            .send(self.request(reqwest::Method::DELETE, url))
            .await?;

        Self::check_status(response).await.map(|_| ())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let message = response.text().await.unwrap_or_default();
        warn!(
            status = status_code,
            message = message,
            "Businessmap API error response"
        );
        Err(Error::from_status(status_code, message))
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    fn map_card(&self, card: ApiCard) -> Card {
        Card {
            id: card.id.to_string(),
            title: card.title,
            description: card
                .description
                .map(|d| clean_text(&d, Some(&self.base_url))),
            board_id: card.board_id.to_string(),
            column_id: card.column_id.map(|id| id.to_string()),
            lane_id: card.lane_id.map(|id| id.to_string()),
            priority: card.priority.map(|p| p.to_string()),
            assignee_ids: card.assignee_ids.map(map_ids),
            tags: card.tags,
            created_at: card.created_at.unwrap_or_default(),
            updated_at: card.updated_at.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Mapping functions: Businessmap payloads -> core types
// =============================================================================

fn map_ids(ids: Vec<ApiId>) -> Vec<String> {
    ids.into_iter().map(|id| id.to_string()).collect()
}

fn map_comment(comment: ApiComment) -> Comment {
    Comment {
        id: comment.id.to_string(),
        card_id: comment.card_id.to_string(),
        text: comment.text,
        author_id: comment.author_id.to_string(),
        author_name: comment.author_name,
        created_at: comment.created_at.unwrap_or_default(),
    }
}

fn map_board(board: ApiBoard) -> Board {
    Board {
        id: board.id.to_string(),
        name: board.name,
        description: board.description,
    }
}

// =============================================================================
// Gateway implementation
// =============================================================================

#[async_trait]
impl Gateway for BusinessmapClient {
    async fn search_cards(&self, query: SearchQuery) -> Result<Vec<Card>> {
        let mut params = vec![
            ("query", query.query),
            ("limit", query.max_results.to_string()),
        ];
        if let Some(boards) = query.board_ids.as_ref().or(self.boards_filter.as_ref()) {
            params.push(("board_ids", boards.join(",")));
        }

        let list: ApiList<ApiCard> = self.get(&self.url("/cards"), &params).await?;

        let cards: Vec<Card> = list
            .data
            .into_iter()
            .map(|c| self.map_card(c))
            .filter(|c| self.board_allowed(&c.board_id))
            .collect();

        debug!(count = cards.len(), "Cards found");
        Ok(cards)
    }

    async fn get_card(&self, card_id: &str) -> Result<Card> {
        let card: ApiCard = self.get(&self.url(&format!("/cards/{}", card_id)), &[]).await?;
        Ok(self.map_card(card))
    }

    async fn create_card(&self, input: CreateCardInput) -> Result<Card> {
        let body = CreateCardRequest {
            board_id: input.board_id,
            workflow_id: input.workflow_id,
            lane_id: input.lane_id,
            column_id: input.column_id,
            title: input.title,
            description: input.description,
            priority: input.priority,
            assignee_ids: input.assignee_ids,
        };

        let card: ApiCard = self.post(&self.url("/cards"), &body).await?;
        Ok(self.map_card(card))
    }

    async fn update_card(&self, input: UpdateCardInput) -> Result<Card> {
        if input.is_empty() {
            return Err(Error::InvalidData(format!(
                "No fields to update for card {}",
                input.card_id
            )));
        }

        let url = self.url(&format!("/cards/{}", input.card_id));
        let body = UpdateCardRequest {
            title: input.title,
            description: input.description,
            column_id: input.column_id,
            lane_id: input.lane_id,
            priority: input.priority,
            assignee_ids: input.assignee_ids,
        };

        let card: ApiCard = self.patch(&url, &body).await?;
        Ok(self.map_card(card))
    }

    async fn delete_card(&self, card_id: &str) -> Result<bool> {
        self.delete(&self.url(&format!("/cards/{}", card_id)))
            .await?;
        Ok(true)
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<Comment> {
        let body = CreateCommentRequest {
            text: text.to_string(),
        };
        let comment: ApiComment = self
            .post(&self.url(&format!("/cards/{}/comments", card_id)), &body)
            .await?;
        Ok(map_comment(comment))
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let list: ApiList<ApiBoard> = self.get(&self.url("/boards"), &[]).await?;

        Ok(list
            .data
            .into_iter()
            .map(map_board)
            .filter(|b| self.board_allowed(&b.id))
            .collect())
    }

    async fn get_board(&self, board_id: &str) -> Result<Board> {
        let board: ApiBoard = self
            .get(&self.url(&format!("/boards/{}", board_id)), &[])
            .await?;
        Ok(map_board(board))
    }
}
