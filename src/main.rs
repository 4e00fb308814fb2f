use tracing_subscriber::EnvFilter;

use chassis::bootstrap::{self, Bootstrap};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    match bootstrap::run(&args) {
        Ok(Bootstrap::VersionPrinted) => Ok(()),
        Ok(Bootstrap::Ready(chassis)) => {
            tracing::info!(
                base_dir = %chassis.base_dir.display(),
                plugins = chassis.registry.len(),
                "Chassis ready"
            );
            // Hand-off point for the service loop.
            Ok(())
        }
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    }
}
