//! Fetch Order Demo
//!
//! Loads a merchant context from a JSON file, builds a Magento client and
//! fetches one order, printing each retry transition on the way.
//!
//! ```text
//! RUST_LOG=debug cargo run --example fetch_order -- merchant.json 42
//! ```

use std::sync::Arc;

use anyhow::{bail, Context};
use magento_sdk::config::DEFAULT_PROVIDER;
use magento_sdk::{AttemptState, ChannelReporter, MagentoClient, MagentoConfig, MerchantContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = std::env::args().skip(1);
    let (Some(merchant_path), Some(order_id)) = (args.next(), args.next()) else {
        bail!("usage: fetch_order <merchant.json> <order-id>");
    };
    let order_id: u64 = order_id.parse().context("order id must be numeric")?;

    let merchant: MerchantContext = serde_json::from_str(
        &std::fs::read_to_string(&merchant_path)
            .with_context(|| format!("reading {}", merchant_path))?,
    )
    .context("parsing merchant context")?;

    let config = MagentoConfig::from_provider(&**DEFAULT_PROVIDER)?;
    println!("Retry policy: {}", config.retry_policy());

    let (reporter, drain) = ChannelReporter::spawn_log_drain();
    let client = MagentoClient::from_merchant_with_config(&merchant, config)?
        .with_reporter(Arc::new(reporter))
        .with_observer(Arc::new(|state: &AttemptState| println!("  -> {:?}", state)));

    match client.get_order(order_id).await {
        Some(order) => println!(
            "Order {} ({}):\n{}",
            order_id,
            order.increment_id().unwrap_or("-"),
            serde_json::to_string_pretty(order.as_value())?
        ),
        None => println!("Order {} could not be fetched", order_id),
    }

    // Dropping the client closes the report channel so the drain finishes
    drop(client);
    drain.await?;

    Ok(())
}
