//! Listening for pushed notifications.
//!
//! Demonstrates:
//! - Building a client for the detected environment
//! - Typed subscriptions for class events
//! - A generic subscription and connection lifecycle signals
//! - Reading the history on exit
//!
//! Usage:
//!   cargo run --example 001_listen
//!   cargo run --example 001_listen -- --endpoint ws://localhost:8088/notifications
//!   cargo run --example 001_listen -- --debug --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use campus_notify::{ConnectionEvent, NotificationClient, Result};
use common::Args;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Listen ===\n");

    // ========================================================================
    // Build Client
    // ========================================================================

    let mut builder = NotificationClient::builder();
    if let Some(endpoint) = &args.endpoint {
        builder = builder.endpoint(endpoint);
    }
    let client = builder.build()?;

    println!("[1] Client ready");
    println!("    Endpoint: {}\n", client.endpoint());

    // ========================================================================
    // Subscribe
    // ========================================================================

    println!("[2] Subscribing...");

    client.on_class_created(|data| {
        println!("    + class {} ({})", data["className"], data["id"]);
    });
    client.on_class_updated(|data| {
        println!("    ~ class {} ({})", data["className"], data["id"]);
    });
    client.on_class_deleted(|data| {
        println!("    - class {}", data["id"]);
    });
    client.on_notification(common::print_notification);
    client.on_connection(|event| match event {
        ConnectionEvent::Connecting { attempt } => println!("    … connecting (attempt {attempt})"),
        ConnectionEvent::Connected => println!("    ✓ connected"),
        ConnectionEvent::Disconnected { code, reason } => {
            println!("    ✗ disconnected ({code:?}) {reason}");
        }
        ConnectionEvent::Error { message } => println!("    ! {message}"),
    });

    println!("    ✓ {} listeners\n", client.router().listener_count());

    // ========================================================================
    // Connect and Wait
    // ========================================================================

    println!("[3] Connecting...");
    client.connect();

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Summary
    // ========================================================================

    let status = client.status();
    println!("\n[4] Status: {} (attempts: {})", status.ready_state, status.reconnect_attempts);

    let history = client.notifications();
    println!("    {} notification(s), {} unread", history.len(), client.unread_count());
    for notification in history.iter().take(5) {
        common::print_notification(notification);
    }

    client.shutdown();
    println!("\n=== Done ===");
    Ok(())
}
