//! Integration tests for the chat action planner against an allow-list
//! catalog.

use std::sync::Arc;

use serde_json::json;
use trellis_catalog::{
    CatalogService, CatalogSource, Endpoint, LexicalRetrieval, Method,
};
use trellis_chat::{ChatPlanner, ChatRequest, PlanStatus, TOOL_NAME};

fn planner() -> ChatPlanner {
    let catalog = Arc::new(CatalogService::new(CatalogSource::AllowList(vec![
        Endpoint::new(Method::Get, "/admin/products"),
        Endpoint::new(Method::Post, "/admin/products"),
        Endpoint::new(Method::Get, "/admin/product-categories"),
        Endpoint::new(Method::Get, "/admin/orders"),
        Endpoint::new(Method::Post, "/admin/orders"),
        Endpoint::new(Method::Delete, "/admin/orders"),
    ])));
    let retrieval = Arc::new(LexicalRetrieval::new(Arc::clone(&catalog)));
    ChatPlanner::new(catalog, retrieval)
}

#[tokio::test]
async fn greeting_produces_no_tool_calls() {
    let response = planner().plan(ChatRequest::message("hi")).await;
    assert!(response.tool_calls.is_empty());
    assert!(response.status.is_none());
    assert!(!response.reply.is_empty());
}

#[tokio::test]
async fn explicit_method_path_is_planned_verbatim() {
    let response = planner()
        .plan(ChatRequest::message("GET /admin/products"))
        .await;

    assert_eq!(response.tool_calls.len(), 1);
    let call = &response.tool_calls[0];
    assert_eq!(call.name, TOOL_NAME);
    assert_eq!(call.arguments["method"], json!("GET"));
    assert_eq!(call.arguments["path"], json!("/admin/products"));
    assert_eq!(call.arguments["openapi"]["method"], json!("GET"));
    assert!(response.reply.contains("GET /admin/products"));
}

#[tokio::test]
async fn explicit_path_is_alias_corrected() {
    // Underscored legacy form resolves through normalization
    let response = planner()
        .plan(ChatRequest::message("GET /admin/product_categories"))
        .await;
    assert_eq!(
        response.tool_calls[0].arguments["path"],
        json!("/admin/product-categories")
    );

    // Known alias resolves through the explicit table
    let response = planner()
        .plan(ChatRequest::message("GET /admin/category"))
        .await;
    assert_eq!(
        response.tool_calls[0].arguments["path"],
        json!("/admin/product-categories")
    );
}

#[tokio::test]
async fn natural_language_intent_is_ranked_against_catalog() {
    let response = planner()
        .plan(ChatRequest::message("please list all products"))
        .await;

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].arguments["method"], json!("GET"));
    assert_eq!(
        response.tool_calls[0].arguments["path"],
        json!("/admin/products")
    );
}

#[tokio::test]
async fn create_intent_maps_to_post() {
    let response = planner()
        .plan(ChatRequest::message("create a new order for me"))
        .await;

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].arguments["method"], json!("POST"));
    assert_eq!(
        response.tool_calls[0].arguments["path"],
        json!("/admin/orders")
    );
}

#[tokio::test]
async fn non_actionable_chitchat_is_not_planned() {
    let response = planner()
        .plan(ChatRequest::message("what a lovely day it is today"))
        .await;
    assert!(response.tool_calls.is_empty());
}

#[tokio::test]
async fn unknown_endpoint_returns_status_and_suggestions() {
    let response = planner()
        .plan(ChatRequest::message("GET /admin/producs"))
        .await;

    assert!(response.tool_calls.is_empty());
    assert_eq!(response.status, Some(PlanStatus::InvalidEndpoint));
    assert!(response.suggestions.len() <= 5);
    assert!(response.reply.contains("not in the API catalog"));
}

#[tokio::test]
async fn body_context_flows_into_plan_and_dependency_hints() {
    let mut request = ChatRequest::message("POST /admin/orders");
    request.context = Some(json!({
        "body": {"product_id": null, "title": "Winter Jacket"}
    }));

    let response = planner().plan(request).await;

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(
        response.tool_calls[0].arguments["body"]["title"],
        json!("Winter Jacket")
    );
    // Dependency planner attached a prerequisite products lookup
    assert_eq!(response.activations.len(), 1);
    assert_eq!(response.activations[0].method, Method::Get);
    assert_eq!(response.activations[0].path, "/admin/products");
    assert!(response.reply.contains("prerequisite"));
}

#[tokio::test]
async fn thread_and_resource_ids_are_echoed() {
    let mut request = ChatRequest::message("hi");
    request.thread_id = Some("t_9".to_string());
    request.resource_id = Some("r_3".to_string());

    let response = planner().plan(request).await;
    assert_eq!(response.thread_id.as_deref(), Some("t_9"));
    assert_eq!(response.resource_id.as_deref(), Some("r_3"));
}

#[tokio::test]
async fn executed_response_is_summarized() {
    let mut request = ChatRequest::message("GET /admin/orders");
    request.context = Some(json!({
        "executed_response": [{"id": "o_1"}, {"id": "o_2"}]
    }));

    let response = planner().plan(request).await;
    assert!(response.reply.contains("Planned request: GET /admin/orders"));
    assert!(response.reply.contains("returned 2 records"));
}

#[tokio::test]
async fn empty_catalog_passes_explicit_actions_through() {
    let catalog = Arc::new(CatalogService::new(CatalogSource::AllowList(vec![])));
    let retrieval = Arc::new(LexicalRetrieval::new(Arc::clone(&catalog)));
    let planner = ChatPlanner::new(catalog, retrieval);

    let response = planner
        .plan(ChatRequest::message("GET /admin/whatever_here"))
        .await;

    // Cannot validate: the plan passes through normalized, not rejected
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(
        response.tool_calls[0].arguments["path"],
        json!("/admin/whatever-here")
    );
}
