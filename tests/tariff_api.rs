mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};

use common::create_test_app;

fn weight_tariff(name: &str) -> Value {
    json!({
        "name": name,
        "service_type": "ship-goods",
        "sub_service": "regular",
        "pricing_model": "weight-based",
        "effective_start": "2026-01-01",
        "weight_tiers": [
            { "min_weight_kg": 0, "max_weight_kg": 100, "rate_per_kg": 5000 }
        ]
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_bulk_create_is_all_or_nothing() {
    let app = create_test_app();

    let mut rows: Vec<Value> = (1..=5).map(|i| weight_tariff(&format!("Reguler {}", i))).collect();
    // weight-based sin tramos
    rows.insert(
        3,
        json!({
            "name": "Sin tramos",
            "service_type": "ship-goods",
            "sub_service": "regular",
            "pricing_model": "weight-based",
            "effective_start": "2026-01-01"
        }),
    );

    let response = app.server.post("/api/tariffs").json(&json!({ "tariffs": rows })).await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "BATCH_REJECTED");
    let failing = body["details"]["rows"].as_array().unwrap();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0]["row"], 4);
    assert_eq!(failing[0]["name"], "Sin tramos");
    assert_eq!(app.store.count_tariffs().await, 0);
}

#[tokio::test]
async fn test_bulk_create_and_read_back() {
    let app = create_test_app();

    let response = app
        .server
        .post("/api/tariffs")
        .json(&json!({ "tariffs": [weight_tariff("Reguler A"), weight_tariff("Reguler B")] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["created"], 2);

    let id = body["data"]["tariffs"][0]["id"].as_str().unwrap().to_string();
    let detail: Value = app.server.get(&format!("/api/tariffs/{}", id)).await.json();
    assert_eq!(detail["data"]["name"], "Reguler A");
    assert_eq!(detail["data"]["weight_tiers"].as_array().unwrap().len(), 1);

    let list: Value = app.server.get("/api/tariffs?pricing_model=weight-based").await.json();
    assert_eq!(list["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_duplicate_and_delete() {
    let app = create_test_app();
    let created: Value = app
        .server
        .post("/api/tariffs")
        .json(&json!({ "tariffs": [weight_tariff("Reguler A")] }))
        .await
        .json();
    let id = created["data"]["tariffs"][0]["id"].as_str().unwrap().to_string();

    let toggled: Value = app
        .server
        .patch(&format!("/api/tariffs/{}/status", id))
        .json(&json!({ "is_active": false }))
        .await
        .json();
    assert_eq!(toggled["data"]["is_active"], false);

    let copy: Value = app.server.post(&format!("/api/tariffs/{}/duplicate", id)).await.json();
    assert_ne!(copy["data"]["id"], json!(id));
    assert_eq!(app.store.count_tariffs().await, 2);

    let deleted = app.server.delete(&format!("/api/tariffs/{}", id)).await;
    assert_eq!(deleted.status_code(), StatusCode::OK);
    let missing = app.server.get(&format!("/api/tariffs/{}", id)).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quote_with_multiplier() {
    let app = create_test_app();
    app.server
        .post("/api/tariffs")
        .json(&json!({ "tariffs": [weight_tariff("Reguler A")] }))
        .await
        .assert_status_ok();

    app.server
        .put("/api/service-multipliers/regular")
        .json(&json!({ "multiplier": 1.4 }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/tariffs/quote")
        .json(&json!({
            "service_type": "ship-goods",
            "sub_service": "regular",
            "date": "2026-03-01",
            "weight_kg": 50,
            "apply_multiplier": true
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["formatted_total"], "Rp 350.000");

    let multipliers: Value = app.server.get("/api/service-multipliers").await.json();
    assert_eq!(multipliers["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_import_reports_rows_and_removes_file() {
    let app = create_test_app();
    let csv = "origin,destination,pricing_model,rate,max_weight_kg\n\
               Jakarta,Bandung,weight-based,5000,100\n\
               Jakarta,,weight-based,5000,100\n\
               Jakarta,Surabaya,per-parcel,1000,\n";

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(csv.as_bytes().to_vec())
            .file_name("tarif.csv")
            .mime_type("text/csv"),
    );
    let response = app.server.post("/api/tariffs/import").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["data"]["total_rows"], 3);
    assert_eq!(body["data"]["valid_rows"].as_array().unwrap().len(), 1);
    let invalid = body["data"]["invalid_rows"].as_array().unwrap();
    assert_eq!(invalid.len(), 2);
    assert_eq!(invalid[0]["row"], 2);
    assert_eq!(invalid[1]["row"], 3);

    // nada persistido y sin archivos temporales
    assert_eq!(app.store.count_tariffs().await, 0);
    assert_eq!(std::fs::read_dir(app.upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_import_rejects_non_csv() {
    let app = create_test_app();
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"PK\x03\x04".to_vec()).file_name("tarif.xlsx"),
    );
    let response = app.server.post("/api/tariffs/import").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(app.upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_bulk_create_rejects_negative_amounts() {
    let app = create_test_app();

    let mut negative = weight_tariff("Minimo negativo");
    negative["min_charge"] = json!(-1000);
    let response = app
        .server
        .post("/api/tariffs")
        .json(&json!({ "tariffs": [weight_tariff("Reguler A"), negative] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let failing = body["details"]["rows"].as_array().unwrap();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0]["row"], 2);
    assert_eq!(failing[0]["reason"], "min_charge: invalid (non_negative)");
    assert_eq!(app.store.count_tariffs().await, 0);
}
