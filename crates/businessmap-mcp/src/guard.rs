//! Read-only enforcement for the gateway.

use std::sync::Arc;

use async_trait::async_trait;
use businessmap_core::{
    Board, Card, Comment, CreateCardInput, Error, Gateway, Result, SearchQuery, UpdateCardInput,
};
use tracing::warn;

/// Gateway decorator that rejects mutations when read-only mode is on.
///
/// Rejected calls never reach the wrapped gateway. Reads always pass through.
pub struct ReadOnlyGateway {
    inner: Arc<dyn Gateway>,
    read_only: bool,
}

impl ReadOnlyGateway {
    pub fn new(inner: Arc<dyn Gateway>, read_only: bool) -> Self {
        Self { inner, read_only }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.read_only {
            warn!(operation = operation, "Rejected mutating operation in read-only mode");
            return Err(Error::ReadOnly {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for ReadOnlyGateway {
    async fn search_cards(&self, query: SearchQuery) -> Result<Vec<Card>> {
        self.inner.search_cards(query).await
    }

    async fn get_card(&self, card_id: &str) -> Result<Card> {
        self.inner.get_card(card_id).await
    }

    async fn create_card(&self, input: CreateCardInput) -> Result<Card> {
        self.check("create_card")?;
        self.inner.create_card(input).await
    }

    async fn update_card(&self, input: UpdateCardInput) -> Result<Card> {
        self.check("update_card")?;
        self.inner.update_card(input).await
    }

    async fn delete_card(&self, card_id: &str) -> Result<bool> {
        self.check("delete_card")?;
        self.inner.delete_card(card_id).await
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<Comment> {
        self.check("add_comment")?;
        self.inner.add_comment(card_id, text).await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.inner.list_boards().await
    }

    async fn get_board(&self, board_id: &str) -> Result<Board> {
        self.inner.get_board(board_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_card, MockGateway};

    #[tokio::test]
    async fn test_read_only_blocks_mutations() {
        let mut mock = MockGateway::new();
        mock.expect_create_card().never();
        mock.expect_update_card().never();
        mock.expect_delete_card().never();
        mock.expect_add_comment().never();

        let guard = ReadOnlyGateway::new(Arc::new(mock), true);

        let err = guard.delete_card("1").await.unwrap_err();
        assert!(matches!(err, Error::ReadOnly { ref operation } if operation == "delete_card"));
        assert!(guard.add_comment("1", "hi").await.is_err());
        assert!(guard
            .create_card(CreateCardInput::default())
            .await
            .is_err());
        assert!(guard
            .update_card(UpdateCardInput::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_read_only_allows_reads() {
        let mut mock = MockGateway::new();
        mock.expect_get_card()
            .times(1)
            .returning(|id| Ok(sample_card(id)));

        let guard = ReadOnlyGateway::new(Arc::new(mock), true);
        assert_eq!(guard.get_card("42").await.unwrap().id, "42");
    }

    #[tokio::test]
    async fn test_writable_passes_through() {
        let mut mock = MockGateway::new();
        mock.expect_delete_card().times(1).returning(|_| Ok(true));

        let guard = ReadOnlyGateway::new(Arc::new(mock), false);
        assert!(!guard.is_read_only());
        assert!(guard.delete_card("42").await.unwrap());
    }
}
