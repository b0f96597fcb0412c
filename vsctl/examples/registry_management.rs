//! Registry Management Example
//!
//! Demonstrates creating, listing, updating and deleting virtual server
//! definitions straight against the registry, without the HTTP layer.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example registry_management
//! ```

use anyhow::Result;
use vsctl::registry::types::{BalanceAlgorithm, ListenerMode, Timeouts, VirtualServerPatch, VirtualServerSpec};
use vsctl::registry::Registry;

#[tokio::main]
async fn main() -> Result<()> {
    println!("Registry Management Example");

    let registry = Registry::new("./registry-example.json");

    println!("\n=== Creating Virtual Servers ===");

    let specs = vec![
        VirtualServerSpec {
            name: "App-Cluster-Main".to_string(),
            port: 443,
            mode: ListenerMode::Https,
            balance: BalanceAlgorithm::Roundrobin,
            backends: vec!["10.0.1.5:8080".to_string(), "10.0.1.6:8080".to_string()],
            max_conn: 5000,
            max_queue: 200,
            timeouts: Timeouts { connect: 5, client: 30, server: 30, queue: 30 },
        },
        VirtualServerSpec {
            name: "Legacy-System-Proxy".to_string(),
            port: 80,
            mode: ListenerMode::Http,
            balance: BalanceAlgorithm::Cookie,
            backends: vec!["192.168.0.10:80".to_string()],
            max_conn: 50,
            max_queue: 50,
            timeouts: Timeouts { connect: 10, client: 60, server: 60, queue: 10 },
        },
    ];

    let mut ids = Vec::new();
    for spec in specs {
        let record = registry.create(spec).await?;
        println!("✓ Created: {} ({})", record.name, record.id);
        ids.push(record.id);
    }

    println!("\n=== Listing All Virtual Servers ===");

    for server in registry.list().await {
        println!("• {} :{} {} {} [{} backend(s), {}]", server.name, server.port, server.mode, server.balance, server.backends.len(), server.status);
    }

    println!("\n=== Validation Collects Every Violation ===");

    let broken = VirtualServerSpec {
        name: "".to_string(),
        port: 0,
        mode: ListenerMode::Http,
        balance: BalanceAlgorithm::Roundrobin,
        backends: vec![],
        max_conn: 0,
        max_queue: 200,
        timeouts: Timeouts::default(),
    };
    match registry.create(broken).await {
        Ok(_) => println!("Unexpectedly accepted a broken definition"),
        Err(e) => println!("Rejected as expected: {}", e),
    }

    println!("\n=== Updating a Virtual Server ===");

    let patch = VirtualServerPatch {
        backends: Some(vec!["10.0.1.5:8080".to_string(), "10.0.1.6:8080".to_string(), "10.0.1.7:8080".to_string()]),
        max_conn: Some(8000),
        ..Default::default()
    };
    let updated = registry.update(ids[0], patch).await?;
    println!("✓ Updated {}: {} backends, maxConn {}", updated.name, updated.backends.len(), updated.max_conn);

    println!("\n=== Removing a Virtual Server ===");

    registry.delete(ids[1]).await?;
    println!("✓ Removed Legacy-System-Proxy");
    println!("Remaining: {}", registry.count().await);

    println!("\n✓ Registry saved to: {}", registry.get_path().display());

    Ok(())
}
