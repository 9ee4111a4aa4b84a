//! Catalog commands: `catalog list` and `watch`.

use storefront_sync::channel::{EventHub, PushChannel, spawn_event_stream};
use storefront_sync::config::ConfigError;
use storefront_sync::remote::RemoteError;
use storefront_sync::{Session, SyncConfig};
use storefront_sync_core::{CurrencyCode, Price, PushEvent};
use tracing::info;

use super::Output;

/// Print every cached product.
pub fn list(session: &Session, output: &Output) {
    let catalog = session.catalog();
    output.emit(catalog.records(), || {
        if catalog.is_placeholder() {
            println!("Catalog unavailable, showing placeholder data");
        }
        for product in catalog.iter() {
            let price = Price::new(product.offer_price, CurrencyCode::default()).to_string();
            let stock = if product.in_stock() {
                format!("stock {}", product.total_stock())
            } else {
                "sold out".to_string()
            };
            println!(
                "{:<26} {:<32} {price:>10}  {stock}",
                product.id.as_str(),
                product.name
            );
        }
    });
}

/// Stream push events into the session until Ctrl-C, printing each one.
///
/// # Errors
///
/// Returns an error if no event stream URL is configured or the HTTP client
/// cannot be built.
pub async fn watch(
    session: &Session,
    config: &SyncConfig,
    hub: EventHub,
    output: &Output,
) -> storefront_sync::Result<()> {
    let url = config
        .remote
        .events_url
        .clone()
        .ok_or_else(|| ConfigError::MissingEnvVar("SYNC_EVENTS_URL".to_string()))?;

    let mut events = hub.subscribe();
    let client = reqwest::Client::builder()
        .build()
        .map_err(RemoteError::from)?;
    let _stream = spawn_event_stream(client, url, hub);
    info!("Watching for catalog events, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                output.emit(&event, || print_event(session, &event));
            }
        }
    }
    Ok(())
}

fn print_event(session: &Session, event: &PushEvent) {
    match event {
        PushEvent::ProductCreated(product) => println!("+ {} {}", product.id, product.name),
        PushEvent::ProductUpdated(product) => println!("~ {} {}", product.id, product.name),
        PushEvent::ProductDeleted(id) => println!("- {id}"),
        PushEvent::StockUpdated {
            product_id,
            size,
            new_stock,
        } => {
            let name = session
                .product(product_id.as_str())
                .map(|p| p.name)
                .unwrap_or_default();
            println!("# {product_id} {name} [{size}] -> {new_stock}");
        }
        PushEvent::OrderCreated(_) => println!("$ order created"),
    }
}
