use docket_api::setup;
use docket_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Telemetry, database, batch engine, routes
    let (state, router) = setup::initialize_app(config.clone()).await?;

    let served = setup::server::start_server(&config, router).await;

    // Queued batches get the configured grace period to finish
    state.batch.engine.stop().await;

    served
}
