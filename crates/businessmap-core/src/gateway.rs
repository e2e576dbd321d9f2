//! Gateway trait for the Businessmap backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Board, Card, Comment, CreateCardInput, SearchQuery, UpdateCardInput};

/// Remote operations against a Businessmap instance.
///
/// The HTTP client implements this; tool handlers only ever see the trait,
/// so test doubles and decorators (such as the read-only guard) slot in freely.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Search cards by text, optionally restricted to boards
    async fn search_cards(&self, query: SearchQuery) -> Result<Vec<Card>>;

    /// Get a single card by ID
    async fn get_card(&self, card_id: &str) -> Result<Card>;

    /// Create a card
    async fn create_card(&self, input: CreateCardInput) -> Result<Card>;

    /// Update the fields set on `input`
    async fn update_card(&self, input: UpdateCardInput) -> Result<Card>;

    /// Delete a card. Returns true when the backend confirmed the deletion.
    async fn delete_card(&self, card_id: &str) -> Result<bool>;

    /// Add a comment to a card
    async fn add_comment(&self, card_id: &str, text: &str) -> Result<Comment>;

    /// List boards visible to the API key
    async fn list_boards(&self) -> Result<Vec<Board>>;

    /// Get a single board by ID
    async fn get_board(&self, board_id: &str) -> Result<Board>;
}
