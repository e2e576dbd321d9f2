//! Shared test infrastructure.
//!
//! `RecordingGateway` serves canned cards and counts every call, so
//! scenarios can assert that a method was never reached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use businessmap_core::{
    Board, Card, Comment, CreateCardInput, Error, Gateway, Result, SearchQuery, UpdateCardInput,
};
use businessmap_mcp::{build_registry, Dispatcher, StdioTransport};
use serde_json::Value;

/// Gateway double backed by an in-memory card map.
#[derive(Default)]
pub struct RecordingGateway {
    cards: Mutex<HashMap<String, Card>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    total: AtomicUsize,
}

impl RecordingGateway {
    pub fn with_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let gateway = Self::default();
        {
            let mut map = gateway.cards.lock().unwrap();
            for card in cards {
                map.insert(card.id.clone(), card);
            }
        }
        gateway
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn card(&self, id: &str) -> Result<Card> {
        self.cards
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Card {} not found", id)))
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn search_cards(&self, query: SearchQuery) -> Result<Vec<Card>> {
        self.record("search_cards");
        let needle = query.query.to_lowercase();
        Ok(self
            .cards
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.title.to_lowercase().contains(&needle))
            .take(query.max_results as usize)
            .cloned()
            .collect())
    }

    async fn get_card(&self, card_id: &str) -> Result<Card> {
        self.record("get_card");
        self.card(card_id)
    }

    async fn create_card(&self, input: CreateCardInput) -> Result<Card> {
        self.record("create_card");
        let mut card = sample_card("100");
        card.title = input.title;
        card.board_id = input.board_id;
        Ok(card)
    }

    async fn update_card(&self, input: UpdateCardInput) -> Result<Card> {
        self.record("update_card");
        let mut card = self.card(&input.card_id)?;
        if let Some(title) = input.title {
            card.title = title;
        }
        Ok(card)
    }

    async fn delete_card(&self, card_id: &str) -> Result<bool> {
        self.record("delete_card");
        Ok(self.cards.lock().unwrap().remove(card_id).is_some())
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<Comment> {
        self.record("add_comment");
        Ok(Comment {
            id: "c1".to_string(),
            card_id: card_id.to_string(),
            text: text.to_string(),
            author_id: "5".to_string(),
            author_name: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        })
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.record("list_boards");
        Ok(vec![])
    }

    async fn get_board(&self, board_id: &str) -> Result<Board> {
        self.record("get_board");
        Err(Error::NotFound(format!("Board {} not found", board_id)))
    }
}

pub fn sample_card(id: &str) -> Card {
    Card {
        id: id.to_string(),
        title: "X".to_string(),
        description: None,
        board_id: "1".to_string(),
        column_id: Some("10".to_string()),
        lane_id: Some("20".to_string()),
        priority: None,
        assignee_ids: None,
        tags: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-02T00:00:00Z".to_string(),
    }
}

/// Feed `input` through a stdio transport and return the parsed output lines.
pub async fn run_stdio(gateway: Arc<RecordingGateway>, read_only: bool, input: &str) -> Vec<Value> {
    let dispatcher = Dispatcher::new(Arc::new(build_registry(gateway, read_only)));

    let mut output = Vec::new();
    let mut transport = StdioTransport::new(input.as_bytes(), &mut output);
    transport.serve(&dispatcher).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
