mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{create_test_app, TestApp};

async fn create_route(app: &TestApp, code: &str) -> Uuid {
    let response = app
        .server
        .post("/api/master-routes")
        .json(&json!({
            "route_code": code,
            "origin_name": "Jakarta",
            "origin_lat": -6.2088,
            "origin_lng": 106.8456,
            "destination_name": "Surabaya",
            "destination_lat": -7.2575,
            "destination_lng": 112.7521,
            "route_type": "one-way",
            "road_constraint": "toll"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

async fn create_gate(app: &TestApp, external_id: &str, lng: f64, toll_fee: Option<f64>) -> Uuid {
    let body: Value = app
        .server
        .post("/api/route-gates")
        .json(&json!({
            "name": format!("Gerbang {}", external_id),
            "gate_type": "toll",
            "lat": -6.5,
            "lng": lng,
            "toll_fee": toll_fee,
            "external_id": external_id
        }))
        .await
        .json();
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_duplicate_route_code_conflicts() {
    let app = create_test_app();
    create_route(&app, "JKT-SBY-01").await;

    let response = app
        .server
        .post("/api/master-routes")
        .json(&json!({
            "route_code": "jkt-sby-01",
            "origin_name": "Jakarta",
            "origin_lat": -6.2,
            "origin_lng": 106.8,
            "destination_name": "Surabaya",
            "destination_lat": -7.2,
            "destination_lng": 112.7,
            "route_type": "one-way",
            "road_constraint": "toll"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_adding_same_gate_twice_keeps_one_link() {
    let app = create_test_app();
    let route_id = create_route(&app, "JKT-SBY-01").await;
    create_gate(&app, "GT-A", 107.0, Some(10_000.0)).await;

    let first: Value = app
        .server
        .post(&format!("/api/master-routes/{}/gates", route_id))
        .json(&json!({ "external_id": "GT-A", "sequence_index": 1 }))
        .await
        .json();
    assert_eq!(first["data"]["created"], true);

    let second: Value = app
        .server
        .post(&format!("/api/master-routes/{}/gates", route_id))
        .json(&json!({ "external_id": "GT-A", "sequence_index": 3 }))
        .await
        .json();
    assert_eq!(second["data"]["created"], false);
    assert_eq!(second["data"]["gate"]["sequence_index"], 3);

    assert_eq!(app.store.count_route_gate_links(route_id).await, 1);
}

#[tokio::test]
async fn test_unknown_gate_is_not_created() {
    let app = create_test_app();
    let route_id = create_route(&app, "JKT-SBY-01").await;

    let response = app
        .server
        .post(&format!("/api/master-routes/{}/gates", route_id))
        .json(&json!({ "external_id": "NOPE" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let gates: Value = app.server.get("/api/route-gates?bbox=90,-12,142,8").await.json();
    assert_eq!(gates["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_route_detail_orders_gates_and_resolves_fees() {
    let app = create_test_app();
    let route_id = create_route(&app, "JKT-SBY-01").await;
    create_gate(&app, "GT-A", 107.0, Some(10_000.0)).await;
    create_gate(&app, "GT-B", 107.5, Some(8_000.0)).await;
    create_gate(&app, "GT-C", 108.0, None).await;

    let url = format!("/api/master-routes/{}/gates", route_id);
    app.server.post(&url).json(&json!({ "external_id": "GT-C" })).await.assert_status_ok();
    app.server
        .post(&url)
        .json(&json!({ "external_id": "GT-B", "sequence_index": 2, "toll_fee_override": 5000 }))
        .await
        .assert_status_ok();
    app.server
        .post(&url)
        .json(&json!({ "external_id": "GT-A", "sequence_index": 1 }))
        .await
        .assert_status_ok();

    let detail: Value = app.server.get(&format!("/api/master-routes/{}", route_id)).await.json();
    let gates = detail["data"]["gates"].as_array().unwrap();
    let order: Vec<&str> = gates.iter().map(|g| g["external_id"].as_str().unwrap()).collect();
    assert_eq!(order, vec!["GT-A", "GT-B", "GT-C"]);
    assert_eq!(gates[0]["toll_fee"], 10_000.0);
    assert_eq!(gates[1]["toll_fee"], 5_000.0);
    assert_eq!(gates[2]["toll_fee"], 0.0);
    assert_eq!(detail["data"]["toll_total"], 15_000.0);
    assert_eq!(detail["data"]["route_code"], "JKT-SBY-01");
}

#[tokio::test]
async fn test_update_and_remove_gate_link() {
    let app = create_test_app();
    let route_id = create_route(&app, "JKT-SBY-01").await;
    let gate_id = create_gate(&app, "GT-B", 107.5, Some(8_000.0)).await;

    app.server
        .post(&format!("/api/master-routes/{}/gates", route_id))
        .json(&json!({ "gate_id": gate_id, "toll_fee_override": 5000 }))
        .await
        .assert_status_ok();

    let cleared: Value = app
        .server
        .put(&format!("/api/master-routes/{}/gates/{}", route_id, gate_id))
        .json(&json!({ "clear_override": true }))
        .await
        .json();
    assert_eq!(cleared["data"]["toll_fee"], 8_000.0);

    let removed = app
        .server
        .delete(&format!("/api/master-routes/{}/gates/{}", route_id, gate_id))
        .await;
    assert_eq!(removed.status_code(), StatusCode::OK);
    assert_eq!(app.store.count_route_gate_links(route_id).await, 0);

    // la caseta sigue en el dataset
    let gates: Value = app.server.get("/api/route-gates?bbox=106,-7,108,-6").await.json();
    assert_eq!(gates["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bbox_with_three_values_is_bad_request() {
    let app = create_test_app();
    let response = app.server.get("/api/route-gates?bbox=106,-7,108").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_polyline_refresh_falls_back_without_provider() {
    let app = create_test_app();
    let route_id = create_route(&app, "JKT-SBY-01").await;

    let response = app
        .server
        .post(&format!("/api/master-routes/{}/polyline", route_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["source"], "fallback");

    let detail: Value = app.server.get(&format!("/api/master-routes/{}", route_id)).await.json();
    assert_eq!(detail["data"]["polyline"]["source"], "fallback");
    assert!(detail["data"]["default_distance_km"].as_f64().unwrap() > 400.0);
}

#[tokio::test]
async fn test_list_routes_with_search() {
    let app = create_test_app();
    create_route(&app, "JKT-SBY-01").await;
    create_route(&app, "JKT-SBY-02").await;

    let page: Value = app.server.get("/api/master-routes?search=sby-02").await.json();
    assert_eq!(page["data"]["total"], 1);
    assert_eq!(page["data"]["items"][0]["route_code"], "JKT-SBY-02");
}

#[tokio::test]
async fn test_list_routes_with_huge_page_is_empty() {
    let app = create_test_app();
    create_route(&app, "JKT-SBY-01").await;

    let response = app.server.get("/api/master-routes?page=9223372036854775807").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["data"]["total"], 1);
    assert_eq!(page["data"]["items"].as_array().unwrap().len(), 0);
}
