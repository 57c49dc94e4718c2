//! Integration tests for the health endpoint and general HTTP behaviour.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, get};
use docflow_core::queue::MemoryJobQueue;

// ---------------------------------------------------------------------------
// Test: no workers -> simple mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_simple_without_workers() {
    let app = common::build_test_app(Arc::new(MemoryJobQueue::new()), false, None);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["server_type"], "simple");
    assert_eq!(json["live"], false);
    assert_eq!(json["worker_count"], 0);
}

// ---------------------------------------------------------------------------
// Test: answering worker -> distributed mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_distributed_with_live_worker() {
    let queue = Arc::new(MemoryJobQueue::new());
    let worker = common::spawn_fake_worker(queue.clone(), "w1");
    let app = common::build_test_app(queue, true, None);

    let json = body_json(get(app, "/health").await).await;
    worker.abort();

    assert_eq!(json["server_type"], "distributed");
    assert_eq!(json["live"], true);
    assert_eq!(json["worker_count"], 1);
}

// ---------------------------------------------------------------------------
// Test: conversion routes are absent without workers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conversion_routes_absent_when_disabled() {
    let app = common::build_test_app(Arc::new(MemoryJobQueue::new()), false, None);
    let response = common::post_multipart(app, "/jobs/convert", &[("pdf_file", "a.pdf", b"%PDF".as_slice())]).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app(Arc::new(MemoryJobQueue::new()), false, None);
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}
