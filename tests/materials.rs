//! Materials library client: parsing, caching, and not-found handling.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::ScriptedTransport;
use conjure_rs::{Classification, ConjureClient};

fn library_entry() -> serde_json::Value {
    json!({
        "id": "al-6061",
        "name": "Aluminum 6061-T6",
        "category": "metal",
        "density_kg_m3": 2700.0,
        "youngs_modulus_pa": 6.89e10,
        "melting_point_c": 582.0
    })
}

#[tokio::test]
async fn listing_parses_and_is_cached() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.set_result("list_materials", json!({ "materials": [library_entry()] }));
    let client = ConjureClient::builder()
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();

    let first = client.list_materials(Some("metal")).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, "al-6061");
    assert_eq!(first[0].density_kg_m3, Some(2700.0));

    // Second listing is served from the session cache.
    let second = client.list_materials(Some("metal")).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(transport.send_count("list_materials"), 1);

    // A different filter is a different cache key.
    client.list_materials(None).await.unwrap();
    assert_eq!(transport.send_count("list_materials"), 2);
}

#[tokio::test]
async fn single_material_lookup() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.set_result("get_material", json!({ "material": library_entry() }));
    let client = ConjureClient::builder()
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();

    let material = client.material("al-6061").await.unwrap();
    assert_eq!(material.name, "Aluminum 6061-T6");
    assert_eq!(material.youngs_modulus_pa, Some(6.89e10));
}

#[tokio::test]
async fn missing_material_is_not_found() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.set_result("get_material", json!({}));
    let client = ConjureClient::builder()
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();

    let err = client.material("unobtainium").await.unwrap_err();
    assert_eq!(err.classification(), Some(Classification::ObjectNotFound));
}
