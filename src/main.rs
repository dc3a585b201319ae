//! Demo entry point for the stalk-oracle forecast loop.
//!
//! Simulates a week that follows one of the catalogue patterns, logs its
//! opening prices through the ledger the way a command layer would, and
//! prints what the engine can already infer from that prefix.

use anyhow::Result;
use stalk_oracle::forecast::{predict, sample_week, PatternKind};
use stalk_oracle::ledger::{LedgerConfig, PriceLedger};
use stalk_oracle::types::Slot;
use tracing::{info, Level};

const DEMO_USER: u64 = 1;
const DEMO_BUY_PRICE: u32 = 102;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting stalk-oracle forecast demo");

    let ledger = PriceLedger::new(LedgerConfig::default());
    let mut rng = rand::thread_rng();

    // Pretend this week secretly follows a large spike.
    let secret_week = sample_week(PatternKind::LargeSpike, DEMO_BUY_PRICE, &mut rng);

    ledger.set_buy_price(DEMO_USER, DEMO_BUY_PRICE).await?;
    info!("Logged Sunday buy price of {} bells", DEMO_BUY_PRICE);

    // The user has checked the shop for the first five half-days.
    for (slot, price) in secret_week.observed().take(5) {
        ledger.set_slot_price(DEMO_USER, slot.index(), price).await?;
        info!(
            "Logged {} bells for {:?} {}",
            price,
            slot.day(),
            if slot.is_morning() { "AM" } else { "PM" }
        );
    }

    let series = ledger.get_series(DEMO_USER).await;
    let prediction = predict(&series, None)?;

    for score in &prediction.patterns {
        info!(
            "{:?}: {:.1}% likely ({}/{} phase-length combinations fit)",
            score.kind,
            score.weight * 100.0,
            score.surviving_combinations,
            score.total_combinations
        );
    }
    for slot in Slot::all().skip(5) {
        let range = prediction.range_at(slot);
        info!(
            "{:?} {}: {}..={} bells",
            slot.day(),
            if slot.is_morning() { "AM" } else { "PM" },
            range.low,
            range.high
        );
    }

    println!("{}", serde_json::to_string_pretty(&prediction)?);

    Ok(())
}
