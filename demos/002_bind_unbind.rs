//! View bindings that come and go.
//!
//! Demonstrates:
//! - Binding a view with typed and generic callbacks
//! - Re-rendering on the binding's update signal
//! - Helper operations (mark read, remove, clear)
//! - Releasing by unbind and by drop
//!
//! Usage:
//!   cargo run --example 002_bind_unbind
//!   cargo run --example 002_bind_unbind -- --endpoint ws://localhost:8088/notifications
//!   cargo run --example 002_bind_unbind -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use campus_notify::{BindCallbacks, Binding, NotificationClient};
use common::Args;
use serde_json::json;
use tokio::time::timeout;

// ============================================================================
// Constants
// ============================================================================

/// How long the first view stays bound.
const VIEW_LIFETIME: Duration = Duration::from_secs(30);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== 002: Bind / Unbind ===\n");

    let mut builder = NotificationClient::builder().history_capacity(20);
    if let Some(endpoint) = &args.endpoint {
        builder = builder.endpoint(endpoint);
    }
    let client = builder.build().context("building client")?;
    client.connect();

    // ========================================================================
    // Bind First View
    // ========================================================================

    println!("[1] Binding class list view...");

    let binding = client.bind(
        BindCallbacks::new()
            .on_class_created(|data| println!("    view: refresh, {} added", data["className"]))
            .on_class_deleted(|data| println!("    view: refresh, {} removed", data["id"])),
    );
    println!("    ✓ {} subscriptions\n", binding.subscription_count());

    println!("[2] Rendering on updates for {}s...", VIEW_LIFETIME.as_secs());
    let _ = timeout(VIEW_LIFETIME, render_loop(&binding)).await;

    if binding.send(&json!({ "type": "PING" })) {
        println!("    ✓ ping sent");
    } else {
        println!("    ✗ not connected, ping dropped");
    }

    if let Some(latest) = binding.notifications().first() {
        binding.mark_read(latest.id);
        println!("    ✓ marked {} read", latest.id);
    }

    client.unbind(binding);
    println!("    ✓ unbound, {} listeners left\n", client.router().listener_count());

    // ========================================================================
    // Scoped Second View
    // ========================================================================

    println!("[3] Scoped view...");
    {
        let scoped = client.bind(BindCallbacks::new().on_notification(common::print_notification));
        println!("    state: {}", scoped.state());
        scoped.clear_all();
        println!("    ✓ history cleared");
    }
    println!("    ✓ dropped, {} listeners left\n", client.router().listener_count());

    common::wait_for_exit(args.no_wait).await;
    client.shutdown();
    println!("=== Done ===");
    Ok(())
}

/// Prints a summary line every time the binding changes.
async fn render_loop(binding: &Binding) {
    let mut updates = binding.updates();
    while updates.changed().await.is_ok() {
        let notifications = binding.notifications();
        let unread = notifications.iter().filter(|n| !n.read).count();
        println!(
            "    render: {} | {} notification(s), {} unread",
            binding.state(),
            notifications.len(),
            unread
        );
    }
}
