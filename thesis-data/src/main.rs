use anyhow::Result;
use clap::Parser;
use thesis_data::{run, Args};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.generate_config()?;

    if let Some(path) = &args.save_config {
        config.save(path)?;
        log::info!("Saved run configuration to {:?}", path);
    }
    if args.show_config {
        println!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let generated = run(&config)?;
    log::info!(
        "Wrote {} episodes, {} in total, to {}",
        generated.episodes.len(),
        generated.meta.num_episodes.unwrap_or_default(),
        generated.path.display()
    );
    Ok(())
}
