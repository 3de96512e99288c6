use color_eyre::eyre::Result;

use sticky_balancer::prelude::*;
use sticky_balancer::utils::tracing::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let settings = Settings::new()?;
    tracing::info!(backends = ?settings.backends, "Loaded configuration");

    LoadBalancer::new(settings)?.run().await?;

    tracing::info!("LoadBalancer stopped");
    Ok(())
}
