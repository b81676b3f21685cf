use std::io;
use std::process;
use std::time::Instant;

use anyhow::Context;
use disaster_classifier::{
    init_logger, parse_args, run_training, Lexicon, ParsedArgs, ResourceManager, TrainOptions, USAGE,
    USAGE_EXIT_CODE,
};
use log::info;

async fn ensure_resources(manager: &ResourceManager, fresh: bool) -> anyhow::Result<()> {
    manager
        .ensure_resources_downloaded(fresh)
        .await
        .context("Failed to prepare language resources")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match parse_args(std::env::args_os()) {
        ParsedArgs::Run(cli) => cli,
        ParsedArgs::Info(e) => e.exit(),
        ParsedArgs::Usage(e) => {
            eprintln!("{}", e);
            println!("{}", USAGE);
            process::exit(USAGE_EXIT_CODE);
        }
    };
    init_logger();

    let start_time = Instant::now();
    let manager = match &cli.resources_dir {
        Some(dir) => ResourceManager::new(dir),
        None => ResourceManager::new_default(),
    }
    .context("Failed to create resource directory")?;

    ensure_resources(&manager, cli.fresh).await?;
    let lexicon = Lexicon::load(&manager).context("Failed to load tokenizer lexicon")?;

    let options = TrainOptions::from(&cli);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_training(&options, lexicon, &mut out).with_context(|| {
        format!(
            "Training failed for database {}",
            options.database_path.display()
        )
    })?;

    info!("=== Training complete (took {:.2?}) ===", start_time.elapsed());
    Ok(())
}
