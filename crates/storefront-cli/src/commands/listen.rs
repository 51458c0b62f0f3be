use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use storefront_application::SessionCoordinator;
use storefront_core::session::{Credentials, Session};
use storefront_interaction::{HttpCartSyncClient, WsTransport};

use super::context::AppContext;

/// Runs the login path, prints channel transitions and notifications until
/// Ctrl-C, then logs out.
pub async fn run(ctx: &AppContext, token: String) -> Result<()> {
    let cart = ctx.open_cart()?;
    let coordinator = SessionCoordinator::new(
        cart,
        Arc::new(HttpCartSyncClient::from_config(&ctx.config.api)),
        Arc::new(WsTransport::from_config(&ctx.config.channel)),
        ctx.config.channel.reconnect.clone(),
    );

    let outcome = coordinator
        .start(Session::authenticated(Credentials::new(token)))
        .await;
    match outcome.sync_error() {
        Some(e) => eprintln!("⚠️  Cart sync failed, continuing with the local cart: {}", e),
        None => println!("✅ Cart synchronized"),
    }

    let mut state = coordinator.channel().subscribe_state();
    let mut poll = tokio::time::interval(Duration::from_millis(500));
    let mut printed = 0usize;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    println!("Listening on {} (Ctrl-C to stop)", ctx.config.channel.url);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                println!("channel: {}", current);
            }
            _ = poll.tick() => {
                printed = print_new_notifications(&coordinator, printed);
            }
        }
    }

    coordinator.set_session(Session::anonymous()).await;
    coordinator.channel().wait_until_closed().await;
    println!("Disconnected.");
    Ok(())
}

fn print_new_notifications(coordinator: &SessionCoordinator, already_printed: usize) -> usize {
    let entries = coordinator.notifications().snapshot();
    // Newest first: the unseen ones are at the head.
    let fresh = entries.len().saturating_sub(already_printed);
    for notification in entries.iter().take(fresh).rev() {
        println!(
            "[{}] {} {}: {}",
            notification.timestamp.format("%Y-%m-%d %H:%M:%S"),
            notification.kind.as_str(),
            notification.id,
            notification.message
        );
    }
    entries.len()
}
