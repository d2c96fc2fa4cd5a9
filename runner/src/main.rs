use std::sync::Arc;

use model::{AppConfig, BakeSpec, Oven};
use runner::core::ProductionCore;
use runner::logger::init_tracing;
use simulation::driver;
use store::{InMemoryOrderStore, InMemoryScheduleStore, LoggingTransport, StaticForecastSvc, StaticSpecStore, SystemClock};

/// The menu this process bakes against, until a real `SpecStore` backend
/// (database-fed, per §3) replaces the static fixture.
fn seed_specs() -> Vec<BakeSpec> {
    vec![
        BakeSpec {
            item_guid: "croissant".into(),
            display_name: "Croissant".into(),
            capacity_per_rack: 24,
            bake_time_minutes: 20,
            cool_time_minutes: 10,
            oven: Oven::Any,
            fresh_window_minutes: 120,
            restock_threshold: 10,
            par_min: 10,
            par_max: Some(200),
            active: true,
        },
        BakeSpec {
            item_guid: "baguette".into(),
            display_name: "Baguette".into(),
            capacity_per_rack: 12,
            bake_time_minutes: 30,
            cool_time_minutes: 15,
            oven: Oven::Fixed(1),
            fresh_window_minutes: 180,
            restock_threshold: 6,
            par_min: 6,
            par_max: Some(120),
            active: true,
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting production core runner...");

    let config = AppConfig::from_env();

    let core = ProductionCore::new(
        config.clone(),
        Arc::new(StaticSpecStore::new(seed_specs())),
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(StaticForecastSvc::new()),
        Arc::new(InMemoryScheduleStore::new()),
        Arc::new(LoggingTransport),
        Arc::new(SystemClock),
    );

    tokio::spawn(driver::run_forever(
        core.registry.clone(),
        core.clock.clone(),
        core.transport.clone(),
        config,
    ));

    tracing::info!("Runner started; waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
