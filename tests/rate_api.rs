mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::create_test_app;

#[tokio::test]
async fn test_calculate_local_band() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/rates/calculate")
        .json(&json!({ "distance_km": 50 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["category"], "FTL Lokal");
    assert_eq!(body["data"]["totalPrice"], 1_250_000.0);
    assert_eq!(body["data"]["formatted_total"], "Rp 1.250.000");
}

#[tokio::test]
async fn test_calculate_intercity_with_toll() {
    let app = create_test_app();
    let body: Value = app
        .server
        .post("/api/rates/calculate")
        .json(&json!({
            "distance_km": 800,
            "include_toll": true,
            "origin": "Jakarta",
            "destination": "Default"
        }))
        .await
        .json();

    assert_eq!(body["data"]["category"], "FTL Antar Kota");
    assert_eq!(body["data"]["days"], 2);
    assert_eq!(body["data"]["tollFee"], 400_000.0);
}

#[tokio::test]
async fn test_calculate_rejects_negative_distance() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/rates/calculate")
        .json(&json!({ "distance_km": -10 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_truck_rental_answers_without_provider() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/rates/truck-rental")
        .json(&json!({
            "origin": { "name": "Jakarta", "lat": -6.2088, "lng": 106.8456 },
            "destination": { "name": "Surabaya", "lat": -7.2575, "lng": 112.7521 }
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let non_toll = &body["data"]["non_toll"];
    let toll = &body["data"]["toll"];
    assert_eq!(non_toll["source"], "fallback");
    assert_eq!(toll["source"], "fallback");
    assert!(toll["distance_km"].as_f64().unwrap() < non_toll["distance_km"].as_f64().unwrap());
    assert_eq!(toll["price"]["tollFee"], 875_000.0);
    assert_eq!(non_toll["price"]["tollFee"], 875_000.0);
}

#[tokio::test]
async fn test_truck_rental_filter_returns_one_variant() {
    let app = create_test_app();
    let body: Value = app
        .server
        .post("/api/rates/truck-rental")
        .json(&json!({
            "origin": { "lat": -6.2088, "lng": 106.8456 },
            "destination": { "lat": -6.2500, "lng": 106.9000 },
            "filter": "non_toll"
        }))
        .await
        .json();

    assert!(body["data"]["toll"].is_null());
    assert_eq!(body["data"]["non_toll"]["price"]["category"], "FTL Lokal");
}

#[tokio::test]
async fn test_truck_rental_rejects_bad_coordinates() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/rates/truck-rental")
        .json(&json!({
            "origin": { "lat": 95.0, "lng": 106.8 },
            "destination": { "lat": -6.25, "lng": 106.9 }
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cost_breakdown_from_rule_table() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/rates/cost-breakdown")
        .json(&json!({
            "origin": "Jakarta",
            "destination": "Surabaya",
            "truck_type": "CDD",
            "distance_km": 850
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["uang_jalan"], 3_121_500.0);
    assert_eq!(body["data"]["source"], "rule_table");
    assert_eq!(body["data"]["formatted"]["uang_jalan"], "Rp 3.121.500");
    assert_eq!(body["data"]["formatted"]["uang_jalan_90_percent"], "Rp 2.809.350");
    assert_eq!(body["data"]["formatted"]["uang_jalan_10_percent"], "Rp 312.150");
}

#[tokio::test]
async fn test_cost_breakdown_rejects_zero_distance() {
    let app = create_test_app();
    let response = app
        .server
        .post("/api/rates/cost-breakdown")
        .json(&json!({ "origin": "Jakarta", "destination": "Surabaya", "distance_km": 0 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
