//! Businessmap tools.
//!
//! Six tools wrap the gateway operations. Their names and parameter names are
//! a contract with callers. List-valued parameters travel as comma-joined
//! strings.
//!
//! Bad arguments are reported inline as `{"error": "..."}` results so a caller
//! can correct itself. Gateway failures (including read-only rejections)
//! become `OPERATION_FAILED` protocol errors.

use std::sync::Arc;

use async_trait::async_trait;
use businessmap_core::types::DEFAULT_MAX_RESULTS;
use businessmap_core::{CreateCardInput, Gateway, SearchQuery, UpdateCardInput};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::guard::ReadOnlyGateway;
use crate::registry::{
    ArgError, ParamSpec, ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolRegistry,
    ToolResult,
};

pub const SEARCH: &str = "businessmap_search";
pub const GET_CARD: &str = "businessmap_get_card";
pub const CREATE_CARD: &str = "businessmap_create_card";
pub const UPDATE_CARD: &str = "businessmap_update_card";
pub const DELETE_CARD: &str = "businessmap_delete_card";
pub const ADD_COMMENT: &str = "businessmap_add_comment";

/// Tools that change data on Businessmap.
pub const MUTATING_TOOLS: [&str; 4] = [CREATE_CARD, UPDATE_CARD, DELETE_CARD, ADD_COMMENT];

/// Build the registry of all Businessmap tools over `gateway`.
///
/// The gateway is always wrapped in [`ReadOnlyGateway`], so mutating tools
/// are rejected before any remote call when `read_only` is set.
pub fn build_registry(gateway: Arc<dyn Gateway>, read_only: bool) -> ToolRegistry {
    let gateway: Arc<dyn Gateway> = Arc::new(ReadOnlyGateway::new(gateway, read_only));
    let mut registry = ToolRegistry::new();

    for descriptor in descriptors(gateway) {
        let registered = registry.register(descriptor);
        debug_assert!(registered.is_ok(), "{:?}", registered);
    }

    registry
}

fn descriptors(gateway: Arc<dyn Gateway>) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            SEARCH,
            "Search for cards in Businessmap",
            vec![
                ParamSpec::string("query", "Text to search for").required(),
                ParamSpec::string(
                    "board_ids",
                    "Comma-separated list of board IDs to search in",
                ),
                ParamSpec::integer("max_results", "Maximum number of results to return")
                    .with_default(json!(DEFAULT_MAX_RESULTS)),
            ],
            Arc::new(SearchCards(gateway.clone())),
        ),
        ToolDescriptor::new(
            GET_CARD,
            "Get a specific card from Businessmap by ID",
            vec![ParamSpec::string("card_id", "Card ID to retrieve").required()],
            Arc::new(GetCard(gateway.clone())),
        ),
        ToolDescriptor::new(
            CREATE_CARD,
            "Create a new card in Businessmap",
            vec![
                ParamSpec::string("board_id", "Board ID").required(),
                ParamSpec::string("workflow_id", "Workflow ID").required(),
                ParamSpec::string("lane_id", "Lane ID").required(),
                ParamSpec::string("column_id", "Column ID").required(),
                ParamSpec::string("title", "Card title").required(),
                ParamSpec::string("description", "Card description"),
                ParamSpec::string("priority", "Card priority"),
                ParamSpec::string("assignee_ids", "Comma-separated list of assignee IDs"),
            ],
            Arc::new(CreateCard(gateway.clone())),
        ),
        ToolDescriptor::new(
            UPDATE_CARD,
            "Update an existing card in Businessmap",
            vec![
                ParamSpec::string("card_id", "Card ID to update").required(),
                ParamSpec::string("title", "New card title"),
                ParamSpec::string("description", "New card description"),
                ParamSpec::string("column_id", "New column ID"),
                ParamSpec::string("lane_id", "New lane ID"),
                ParamSpec::string("priority", "New priority"),
                ParamSpec::string(
                    "assignee_ids",
                    "Comma-separated list of new assignee IDs",
                ),
            ],
            Arc::new(UpdateCard(gateway.clone())),
        ),
        ToolDescriptor::new(
            DELETE_CARD,
            "Delete a card from Businessmap",
            vec![ParamSpec::string("card_id", "Card ID to delete").required()],
            Arc::new(DeleteCard(gateway.clone())),
        ),
        ToolDescriptor::new(
            ADD_COMMENT,
            "Add a comment to a card in Businessmap",
            vec![
                ParamSpec::string("card_id", "Card ID").required(),
                ParamSpec::string("text", "Comment text").required(),
            ],
            Arc::new(AddComment(gateway)),
        ),
    ]
}

// =============================================================================
// Handler plumbing
// =============================================================================

enum HandlerError {
    Argument(ArgError),
    Gateway(businessmap_core::Error),
}

impl From<ArgError> for HandlerError {
    fn from(err: ArgError) -> Self {
        HandlerError::Argument(err)
    }
}

impl From<businessmap_core::Error> for HandlerError {
    fn from(err: businessmap_core::Error) -> Self {
        HandlerError::Gateway(err)
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(|e| HandlerError::Gateway(e.into()))
}

fn finish(tool: &str, outcome: Result<Value, HandlerError>) -> ToolResult {
    match outcome {
        Ok(value) => Ok(value),
        Err(HandlerError::Argument(err)) => {
            debug!(tool = tool, error = %err, "Invalid tool arguments");
            Ok(json!({ "error": err.to_string() }))
        }
        Err(HandlerError::Gateway(err)) => Err(ToolError::from(err)),
    }
}

// =============================================================================
// Handlers
// =============================================================================

struct SearchCards(Arc<dyn Gateway>);

impl SearchCards {
    async fn run(&self, args: ToolArgs) -> Result<Value, HandlerError> {
        let query = SearchQuery {
            query: args.required_str("query")?,
            board_ids: args.optional_list("board_ids")?,
            max_results: args
                .optional_u32("max_results")?
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_RESULTS),
        };
        to_json(self.0.search_cards(query).await?)
    }
}

#[async_trait]
impl ToolHandler for SearchCards {
    async fn call(&self, args: ToolArgs) -> ToolResult {
        finish(SEARCH, self.run(args).await)
    }
}

struct GetCard(Arc<dyn Gateway>);

impl GetCard {
    async fn run(&self, args: ToolArgs) -> Result<Value, HandlerError> {
        let card_id = args.required_str("card_id")?;
        to_json(self.0.get_card(&card_id).await?)
    }
}

#[async_trait]
impl ToolHandler for GetCard {
    async fn call(&self, args: ToolArgs) -> ToolResult {
        finish(GET_CARD, self.run(args).await)
    }
}

struct CreateCard(Arc<dyn Gateway>);

impl CreateCard {
    async fn run(&self, args: ToolArgs) -> Result<Value, HandlerError> {
        let input = CreateCardInput {
            board_id: args.required_str("board_id")?,
            workflow_id: args.required_str("workflow_id")?,
            lane_id: args.required_str("lane_id")?,
            column_id: args.required_str("column_id")?,
            title: args.required_str("title")?,
            description: args.optional_str("description")?,
            priority: args.optional_str("priority")?,
            assignee_ids: args.optional_list("assignee_ids")?,
        };
        to_json(self.0.create_card(input).await?)
    }
}

#[async_trait]
impl ToolHandler for CreateCard {
    async fn call(&self, args: ToolArgs) -> ToolResult {
        finish(CREATE_CARD, self.run(args).await)
    }
}

struct UpdateCard(Arc<dyn Gateway>);

impl UpdateCard {
    async fn run(&self, args: ToolArgs) -> Result<Value, HandlerError> {
        let input = UpdateCardInput {
            card_id: args.required_str("card_id")?,
            title: args.optional_str("title")?,
            description: args.optional_str("description")?,
            column_id: args.optional_str("column_id")?,
            lane_id: args.optional_str("lane_id")?,
            priority: args.optional_str("priority")?,
            assignee_ids: args.optional_list("assignee_ids")?,
        };
        to_json(self.0.update_card(input).await?)
    }
}

#[async_trait]
impl ToolHandler for UpdateCard {
    async fn call(&self, args: ToolArgs) -> ToolResult {
        finish(UPDATE_CARD, self.run(args).await)
    }
}

struct DeleteCard(Arc<dyn Gateway>);

impl DeleteCard {
    async fn run(&self, args: ToolArgs) -> Result<Value, HandlerError> {
        let card_id = args.required_str("card_id")?;
        to_json(self.0.delete_card(&card_id).await?)
    }
}

#[async_trait]
impl ToolHandler for DeleteCard {
    async fn call(&self, args: ToolArgs) -> ToolResult {
        finish(DELETE_CARD, self.run(args).await)
    }
}

struct AddComment(Arc<dyn Gateway>);

impl AddComment {
    async fn run(&self, args: ToolArgs) -> Result<Value, HandlerError> {
        let card_id = args.required_str("card_id")?;
        let text = args.required_str("text")?;
        to_json(self.0.add_comment(&card_id, &text).await?)
    }
}

#[async_trait]
impl ToolHandler for AddComment {
    async fn call(&self, args: ToolArgs) -> ToolResult {
        finish(ADD_COMMENT, self.run(args).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_card, sample_comment, MockGateway};
    use businessmap_core::Error;

    fn registry(mock: MockGateway, read_only: bool) -> ToolRegistry {
        build_registry(Arc::new(mock), read_only)
    }

    async fn call(registry: &ToolRegistry, tool: &str, args: Value) -> ToolResult {
        registry
            .get(tool)
            .unwrap()
            .handler
            .call(ToolArgs::from_value(args))
            .await
    }

    #[test]
    fn test_catalogue() {
        let registry = registry(MockGateway::new(), false);
        let names: Vec<_> = registry.list().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![SEARCH, GET_CARD, CREATE_CARD, UPDATE_CARD, DELETE_CARD, ADD_COMMENT]
        );
    }

    #[test]
    fn test_schemas_declare_contract_params() {
        let registry = registry(MockGateway::new(), false);

        let search = registry.get(SEARCH).unwrap().parameters();
        assert_eq!(search["required"], json!(["query"]));
        assert_eq!(search["properties"]["board_ids"]["type"], "string");
        assert_eq!(search["properties"]["max_results"]["type"], "integer");
        assert_eq!(search["properties"]["max_results"]["default"], 50);

        let create = registry.get(CREATE_CARD).unwrap().parameters();
        assert_eq!(
            create["required"],
            json!(["board_id", "workflow_id", "lane_id", "column_id", "title"])
        );
        assert_eq!(create["properties"]["assignee_ids"]["type"], "string");

        let update = registry.get(UPDATE_CARD).unwrap().parameters();
        assert_eq!(update["required"], json!(["card_id"]));
        assert_eq!(update["properties"].as_object().unwrap().len(), 7);

        let comment = registry.get(ADD_COMMENT).unwrap().parameters();
        assert_eq!(comment["required"], json!(["card_id", "text"]));
    }

    #[tokio::test]
    async fn test_search_parses_params() {
        let mut mock = MockGateway::new();
        mock.expect_search_cards()
            .withf(|q| {
                q.query == "bug"
                    && q.board_ids == Some(vec!["1".to_string(), "2".to_string()])
                    && q.max_results == 10
            })
            .times(1)
            .returning(|_| Ok(vec![sample_card("42")]));

        let registry = registry(mock, false);
        let out = call(
            &registry,
            SEARCH,
            json!({"query": "bug", "board_ids": "1,2", "max_results": "10"}),
        )
        .await
        .unwrap();

        assert_eq!(out[0]["id"], "42");
        assert_eq!(out[0]["boardId"], "1");
    }

    #[tokio::test]
    async fn test_search_defaults_max_results() {
        let mut mock = MockGateway::new();
        mock.expect_search_cards()
            .withf(|q| q.max_results == 50 && q.board_ids.is_none())
            .times(1)
            .returning(|_| Ok(vec![]));

        let registry = registry(mock, false);
        let out = call(&registry, SEARCH, json!({"query": "bug"})).await.unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_missing_argument_reported_inline() {
        let mut mock = MockGateway::new();
        mock.expect_get_card().never();

        let registry = registry(mock, false);
        let out = call(&registry, GET_CARD, json!({})).await.unwrap();
        assert_eq!(out, json!({"error": "Missing required parameter: card_id"}));
    }

    #[tokio::test]
    async fn test_bad_max_results_reported_inline() {
        let mut mock = MockGateway::new();
        mock.expect_search_cards().never();

        let registry = registry(mock, false);
        let out = call(&registry, SEARCH, json!({"query": "x", "max_results": "lots"}))
            .await
            .unwrap();
        assert!(out["error"].as_str().unwrap().contains("max_results"));
    }

    #[tokio::test]
    async fn test_gateway_error_becomes_tool_error() {
        let mut mock = MockGateway::new();
        mock.expect_get_card()
            .returning(|_| Err(Error::from_status(500, "down")));

        let registry = registry(mock, false);
        let err = call(&registry, GET_CARD, json!({"card_id": "1"}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "API error: 500 - down");
        assert_eq!(err.data, Some(json!({"kind": "api", "status": 500})));
    }

    #[tokio::test]
    async fn test_create_card_maps_params() {
        let mut mock = MockGateway::new();
        mock.expect_create_card()
            .withf(|input| {
                input.board_id == "1"
                    && input.workflow_id == "2"
                    && input.title == "New"
                    && input.assignee_ids == Some(vec!["7".to_string(), "8".to_string()])
                    && input.description.is_none()
            })
            .times(1)
            .returning(|_| Ok(sample_card("100")));

        let registry = registry(mock, false);
        let out = call(
            &registry,
            CREATE_CARD,
            json!({
                "board_id": "1",
                "workflow_id": "2",
                "lane_id": "3",
                "column_id": "4",
                "title": "New",
                "assignee_ids": "7,8"
            }),
        )
        .await
        .unwrap();
        assert_eq!(out["id"], "100");
    }

    #[tokio::test]
    async fn test_update_card_passes_only_given_fields() {
        let mut mock = MockGateway::new();
        mock.expect_update_card()
            .withf(|input| {
                input.card_id == "42"
                    && input.priority.as_deref() == Some("high")
                    && input.title.is_none()
            })
            .times(1)
            .returning(|input| Ok(sample_card(&input.card_id)));

        let registry = registry(mock, false);
        let out = call(
            &registry,
            UPDATE_CARD,
            json!({"card_id": "42", "priority": "high"}),
        )
        .await
        .unwrap();
        assert_eq!(out["id"], "42");
    }

    #[tokio::test]
    async fn test_delete_and_comment() {
        let mut mock = MockGateway::new();
        mock.expect_delete_card().times(1).returning(|_| Ok(true));
        mock.expect_add_comment()
            .times(1)
            .returning(|card_id, text| Ok(sample_comment(card_id, text)));

        let registry = registry(mock, false);
        let out = call(&registry, DELETE_CARD, json!({"card_id": "42"}))
            .await
            .unwrap();
        assert_eq!(out, json!(true));

        let out = call(&registry, ADD_COMMENT, json!({"card_id": "42", "text": "hi"}))
            .await
            .unwrap();
        assert_eq!(out["cardId"], "42");
        assert_eq!(out["text"], "hi");
    }

    #[tokio::test]
    async fn test_read_only_rejects_every_mutating_tool() {
        let mut mock = MockGateway::new();
        mock.expect_create_card().never();
        mock.expect_update_card().never();
        mock.expect_delete_card().never();
        mock.expect_add_comment().never();

        let registry = registry(mock, true);
        let args = json!({
            "card_id": "1",
            "board_id": "1",
            "workflow_id": "1",
            "lane_id": "1",
            "column_id": "1",
            "title": "t",
            "text": "t"
        });

        for tool in MUTATING_TOOLS {
            let err = call(&registry, tool, args.clone()).await.unwrap_err();
            assert!(err.message.contains("read-only"), "{}: {}", tool, err.message);
            assert_eq!(err.data.as_ref().unwrap()["kind"], "read_only");
        }
    }
}
