//! Builder-surface chaining: issue order, identity tracking, and local
//! stale-identity detection.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::ScriptedTransport;
use conjure_rs::{Axis, Classification, ConjureClient, ObjectState, Part};

async fn part_with(transport: Arc<ScriptedTransport>) -> Part {
    Part::open_with(ConjureClient::builder().transport(transport))
        .await
        .unwrap()
}

#[tokio::test]
async fn chained_operations_execute_in_issue_order() {
    let transport = Arc::new(ScriptedTransport::new());
    let part = part_with(transport.clone()).await;

    let mut a = part.cuboid(10.0, 10.0, 10.0).await.unwrap();
    a.translate(1.0, 0.0, 0.0)
        .await
        .unwrap()
        .rotate(Axis::Z, 90.0)
        .await
        .unwrap();

    assert_eq!(
        transport.sent(),
        vec!["open_document", "create_box", "move_object", "rotate_object"]
    );
}

#[tokio::test]
async fn identity_follows_a_replacement_reply() {
    let transport = Arc::new(ScriptedTransport::new());
    // The rotate reply carries a replacement identity.
    transport.set_result("rotate_object", json!({ "object": "obj-rotated" }));
    let part = part_with(transport.clone()).await;

    let mut a = part.cuboid(10.0, 10.0, 10.0).await.unwrap();
    let original = a.id().clone();

    a.translate(1.0, 0.0, 0.0)
        .await
        .unwrap()
        .rotate(Axis::Z, 90.0)
        .await
        .unwrap();

    assert_eq!(a.id().as_str(), "obj-rotated");

    // Graph reflects the replacement: old identity invalidated, new one live.
    let records = part.client().objects();
    let old = records.iter().find(|r| r.id == original).unwrap();
    assert_eq!(old.state, ObjectState::Invalidated);
    let new = records.iter().find(|r| r.id.as_str() == "obj-rotated").unwrap();
    assert_eq!(new.state, ObjectState::Live);
}

#[tokio::test]
async fn stale_tool_fails_locally_without_a_round_trip() {
    let transport = Arc::new(ScriptedTransport::new());
    let part = part_with(transport.clone()).await;

    let mut base = part.cuboid(100.0, 50.0, 30.0).await.unwrap();
    let mut tool = part.cylinder(5.0, 40.0).await.unwrap();

    base.cut(&tool).await.unwrap();

    let before = transport.sent().len();
    let err = tool.translate(1.0, 0.0, 0.0).await.unwrap_err();
    assert_eq!(err.classification(), Some(Classification::ObjectNotFound));
    // Rejected before any network dispatch.
    assert_eq!(transport.sent().len(), before);
}

#[tokio::test]
async fn union_consumes_its_operands() {
    let transport = Arc::new(ScriptedTransport::new());
    let part = part_with(transport.clone()).await;

    let a = part.cuboid(10.0, 10.0, 10.0).await.unwrap();
    let b = part.sphere(4.0).await.unwrap();
    let merged = part.union(&[&a, &b]).await.unwrap();

    assert_ne!(merged.id(), a.id());
    let client = part.client();
    for consumed in [a.id(), b.id()] {
        let record = client
            .objects()
            .into_iter()
            .find(|r| r.id == *consumed)
            .unwrap();
        assert_eq!(record.state, ObjectState::Invalidated);
    }

    // A consumed operand cannot be exported either.
    let err = part.export_stl(&[&a]).await.unwrap_err();
    assert_eq!(err.classification(), Some(Classification::ObjectNotFound));
}

#[tokio::test]
async fn auto_generated_names_are_sequential() {
    let transport = Arc::new(ScriptedTransport::new());
    let part = part_with(transport.clone()).await;

    let a = part.cuboid(1.0, 1.0, 1.0).await.unwrap();
    let b = part.cylinder(1.0, 2.0).await.unwrap();

    let records = part.client().objects();
    let name_of = |id: &conjure_rs::ObjectId| {
        records
            .iter()
            .find(|r| r.id == *id)
            .and_then(|r| r.produced_by.params().get("name").cloned())
            .unwrap()
    };
    assert_eq!(name_of(a.id()), "Box_1");
    assert_eq!(name_of(b.id()), "Cylinder_2");
}
