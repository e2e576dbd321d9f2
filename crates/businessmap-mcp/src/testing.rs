//! Shared test doubles.

use async_trait::async_trait;
use businessmap_core::{
    Board, Card, Comment, CreateCardInput, Gateway, Result, SearchQuery, UpdateCardInput,
};
use mockall::mock;

mock! {
    pub Gateway {}

    #[async_trait]
    impl Gateway for Gateway {
        async fn search_cards(&self, query: SearchQuery) -> Result<Vec<Card>>;
        async fn get_card(&self, card_id: &str) -> Result<Card>;
        async fn create_card(&self, input: CreateCardInput) -> Result<Card>;
        async fn update_card(&self, input: UpdateCardInput) -> Result<Card>;
        async fn delete_card(&self, card_id: &str) -> Result<bool>;
        async fn add_comment(&self, card_id: &str, text: &str) -> Result<Comment>;
        async fn list_boards(&self) -> Result<Vec<Board>>;
        async fn get_board(&self, board_id: &str) -> Result<Board>;
    }
}

pub fn sample_card(id: &str) -> Card {
    Card {
        id: id.to_string(),
        title: "X".to_string(),
        description: None,
        board_id: "1".to_string(),
        column_id: None,
        lane_id: None,
        priority: None,
        assignee_ids: None,
        tags: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn sample_comment(card_id: &str, text: &str) -> Comment {
    Comment {
        id: "c1".to_string(),
        card_id: card_id.to_string(),
        text: text.to_string(),
        author_id: "5".to_string(),
        author_name: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}
