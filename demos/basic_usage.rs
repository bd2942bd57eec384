//! Imperative client walkthrough.
//!
//! Requires CONJURE_API_KEY and CONJURE_API_URL in the environment:
//! cargo run --example basic_usage

use conjure_rs::{Axis, ConjureClient, ExportFormat, ObjectOpts, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conjure_rs=info".into()),
        )
        .init();

    let client = ConjureClient::builder().document("Demo").connect().await?;

    let base = client
        .create_box(100.0, 50.0, 30.0, ObjectOpts::new().name("base"))
        .await?;
    let post = client
        .create_cylinder(5.0, 60.0, ObjectOpts::new().position([20.0, 25.0, 0.0]))
        .await?;

    client.rotate(&post, Axis::X, 15.0).await?;
    let assembly = client.union(&[&base, &post], ObjectOpts::new()).await?;
    client.fillet(&assembly, 2.0, &["top"]).await?;

    let bb = client.bounding_box(&assembly).await?;
    println!("assembly size: {:?}", bb.size());

    for record in client.objects() {
        println!("{} <- {}", record.id, record.produced_by.wire_name());
    }

    let written = client
        .export(ExportFormat::Stl, &[&assembly])
        .await?
        .save("assembly.stl")
        .await?;
    println!("wrote {written} bytes");

    client.close().await
}
