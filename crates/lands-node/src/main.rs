use clap::Parser;
use lands_geometry::region_geometry;
use lands_logging::LandsSubscriberBuilder;
use lands_node::cli::{Cli, Command};
use lands_node::{LandsConfig, LandsNode};
use lands_storage::open_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = LandsConfig::load_or_init(&cli.config)?;

    let mut logging = LandsSubscriberBuilder::new().with_config(config.logging.clone());
    if let Some(level) = &cli.log_level {
        logging = logging.with_level(level);
    }
    let _guard = logging.init();

    match cli.command {
        Command::Run { worlds } => {
            let worlds = if worlds.is_empty() {
                config.validation.allowed_worlds.clone()
            } else {
                worlds
            };

            let node = LandsNode::new(config)?;
            node.start().await?;
            for world in &worlds {
                node.register_world(world).await;
            }

            println!("Running; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            node.stop().await?;
        }

        Command::Validate => {
            let store = open_store(&config.storage, config.validation.store_options())?;
            let manifest = store.load(true).await?;

            let Some(report) = store.load_report().await else {
                println!("No data in {}", store.describe());
                return Ok(());
            };
            println!("Store:       {}", store.describe());
            if let Some(manifest) = manifest {
                println!("Hash:        {}", manifest.hash);
                println!("Timestamp:   {}", manifest.timestamp);
            }
            println!("Regions:     {}", report.regions);
            println!("Malformed:   {}", report.malformed);
            println!("Invalid:     {}", report.invalid);
            println!("Fingerprint: {}", report.fingerprint);

            if report.malformed > 0 || report.invalid > 0 {
                anyhow::bail!(
                    "{} malformed and {} invalid regions",
                    report.malformed,
                    report.invalid
                );
            }
        }

        Command::Geometry { region_id } => {
            let store = open_store(&config.storage, config.validation.store_options())?;
            let Some(region) = store.get_region(&region_id).await? else {
                anyhow::bail!("Region '{region_id}' not found");
            };
            let geometry = region_geometry(&region);
            println!("{}", serde_json::to_string_pretty(&geometry)?);
        }
    }

    Ok(())
}
