//! Lifecycle Example
//!
//! Walks a virtual server through its status transitions with no balancer
//! attached, then renders its configuration artifact.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example lifecycle
//! ```

use anyhow::Result;
use std::sync::Arc;
use vsctl::control::NoopControl;
use vsctl::lifecycle::LifecycleController;
use vsctl::registry::types::{BalanceAlgorithm, ListenerMode, Timeouts, VirtualServerSpec};
use vsctl::registry::Registry;
use vsctl::render;

#[tokio::main]
async fn main() -> Result<()> {
    println!("Lifecycle Example");

    let registry = Registry::new("./lifecycle-example.json");
    let controller = LifecycleController::new(registry.clone(), Arc::new(NoopControl));

    let record = registry
        .create(VirtualServerSpec {
            name: "Payment-Gateway".to_string(),
            port: 443,
            mode: ListenerMode::Https,
            balance: BalanceAlgorithm::Cookie,
            backends: vec!["10.0.0.1:80".to_string(), "10.0.0.2:80".to_string()],
            max_conn: 50,
            max_queue: 200,
            timeouts: Timeouts { connect: 5, client: 30, server: 30, queue: 30 },
        })
        .await?;
    println!("Created {} with status '{}'", record.name, record.status);

    println!("\n=== Activate ===");
    let record = controller.activate(record.id).await?;
    println!("Status: {}", record.status);

    println!("\n=== Maintenance Override ===");
    let record = controller.set_maintenance(record.id).await?;
    println!("Status: {}", record.status);

    // An explicit activation leaves maintenance again
    let record = controller.activate(record.id).await?;
    println!("Back to: {}", record.status);

    println!("\n=== Rendered Configuration ===");
    let rendered = render::render(&record)?;
    println!("--- {} ---", rendered.filename);
    print!("{}", rendered.contents);

    println!("\n=== Deactivate and Remove ===");
    let record = controller.deactivate(record.id).await?;
    println!("Status: {}", record.status);
    controller.remove(record.id).await?;
    println!("Removed; registry now holds {} records", registry.count().await);

    Ok(())
}
