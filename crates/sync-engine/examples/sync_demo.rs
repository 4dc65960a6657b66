// crates/sync-engine/examples/sync_demo.rs
//! Demonstration of sync engine capabilities

use serde_json::json;
use shopsync_core::{RecordType, ResolutionStrategy};
use shopsync_sync_engine::{
    EngineSettings, MemoryGateway, MemoryStore, RemoteGateway, SyncEngine, SyncResult,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ShopSync Sync Engine Demo");
    println!("=========================\n");

    let remote = Arc::new(MemoryGateway::new());

    demo_offline_queue(remote.clone()).await?;
    println!();
    demo_multi_device(remote).await?;
    Ok(())
}

fn engine(remote: Arc<MemoryGateway>, platform: &str) -> SyncEngine {
    SyncEngine::new(
        Arc::new(MemoryStore::new()),
        remote,
        EngineSettings {
            strategy: ResolutionStrategy::Merge,
            platform: platform.to_string(),
            ..EngineSettings::default()
        },
    )
}

fn report(label: &str, result: &SyncResult) {
    if result.success {
        println!(
            "  ✓ {}: {} records, {} conflicts",
            label,
            result.synced_items,
            result.conflicts.len()
        );
    } else {
        println!("  ✗ {}: {}", label, result.errors.join("; "));
    }
}

async fn demo_offline_queue(remote: Arc<MemoryGateway>) -> Result<(), Box<dyn std::error::Error>> {
    println!("1. Offline Writes");
    println!("-----------------");

    let phone = engine(remote.clone(), "ios");
    println!("Device ID: {}", phone.device_id().await);

    phone.set_online_status(false).await?;
    phone
        .write_local("shopper", RecordType::Wishlist, json!([{"productId": "sneaker-42"}]))
        .await?;
    println!("  Queued writes: {}", phone.queue().len().await?);
    report("Sync while offline", &phone.sync_user_data("shopper").await);

    phone.set_online_status(true).await?;
    let drained = phone.process_sync_queue("shopper").await?;
    println!("  ✓ Drained {} queued writes", drained);
    report("Sync after reconnect", &phone.sync_user_data("shopper").await);
    Ok(())
}

async fn demo_multi_device(remote: Arc<MemoryGateway>) -> Result<(), Box<dyn std::error::Error>> {
    println!("2. Two Devices, One Cart");
    println!("------------------------");

    let phone = engine(remote.clone(), "ios");
    let laptop = engine(remote.clone(), "web");

    phone
        .write_local("shopper", RecordType::Cart, json!([{"productId": "tee", "quantity": 2}]))
        .await?;
    report("Phone", &phone.sync_user_data("shopper").await);
    report("Laptop pulls", &laptop.sync_user_data("shopper").await);

    laptop
        .write_local(
            "shopper",
            RecordType::Cart,
            json!([{"productId": "tee", "quantity": 3}, {"productId": "cap", "quantity": 1}]),
        )
        .await?;
    report("Laptop", &laptop.sync_user_data("shopper").await);
    report("Phone", &phone.sync_user_data("shopper").await);

    for record in remote.fetch_records("shopper").await? {
        println!("  {} v{}: {}", record.id, record.version, record.payload);
    }
    Ok(())
}
