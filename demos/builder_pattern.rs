//! Builder-pattern walkthrough: a drilled mounting plate.
//!
//! Requires CONJURE_API_KEY and CONJURE_API_URL in the environment:
//! cargo run --example builder_pattern

use conjure_rs::{Part, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conjure_rs=info".into()),
        )
        .init();

    Part::scope("MountingPlate", |p| async move {
        let mut plate = p.cuboid(120.0, 80.0, 6.0).await?;

        // One bolt hole near each corner.
        for (x, y) in [(10.0, 10.0), (110.0, 10.0), (10.0, 70.0), (110.0, 70.0)] {
            let hole = p.hole(5.0, 10.0, [x, y, 0.0]).await?;
            plate.cut(&hole).await?;
        }

        plate.chamfer(&["top"], 0.5).await?;

        let bytes = p.export_stl(&[&plate]).await?.collect().await?;
        println!("plate mesh: {} bytes", bytes.len());
        Ok(())
    })
    .await
}
