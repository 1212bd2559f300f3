//! Command-line entry points.

pub mod config;

use crate::config::Command;

/// Dispatch a parsed top-level CLI command. `Run` is handled by the
/// binary directly since it owns the tick loop's lifetime; everything
/// else is a one-shot operation.
pub async fn dispatch(command: Command, cfg: &crate::config::Config) -> anyhow::Result<()> {
    match command {
        Command::Run => unreachable!("Run is handled by main() directly"),
        Command::Config { cmd } => config::run_config_command(cmd),
        Command::Migrate => {
            let store = crate::store::Store::connect(&cfg.database).await?;
            store.run_migrations().await?;
            println!("Migrations applied.");
            Ok(())
        }
        Command::Plant { wish } => {
            let store = crate::store::Store::connect(&cfg.database).await?;
            let bus = crate::bus::HormoneBus::new(8);
            let text_model = crate::textmodel::TextModel::new(cfg.text_model.clone());
            let seed =
                crate::growth::intake::plant_wish(&store, &bus, &text_model, None, &wish).await?;
            println!("Planted seed {} — \"{}\"", seed.id, seed.essence);
            Ok(())
        }
    }
}
