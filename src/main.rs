use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use order_normalizer::config::AppConfig;
use order_normalizer::handler::handle_latest;
use order_normalizer::logging;
use order_normalizer::pipeline::process_path;
use order_normalizer::storage::{DirectorySink, LocalObjectStore, OutputSink};
use order_normalizer::watch::{DirectoryPoller, Watcher};

#[derive(Parser, Debug)]
#[command(name = "order-normalizer", version, about = "Normalizes e-commerce order exports into canonical CSV")]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll a directory and process every new or modified export
    Watch {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        poll_interval_secs: Option<u64>,
        #[arg(long)]
        settle_delay_secs: Option<u64>,
    },
    /// Process the most recently modified object of the input bucket directory
    Handle {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Process a single file
    Process {
        file: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log);

    let mut cfg = match &cli.config {
        Some(p) => AppConfig::from_path(p).with_context(|| format!("loading {}", p.display()))?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Watch {
            input_dir,
            output_dir,
            poll_interval_secs,
            settle_delay_secs,
        } => {
            override_dirs(&mut cfg, input_dir, output_dir);
            if let Some(v) = poll_interval_secs {
                cfg.poll_interval_secs = v;
            }
            if let Some(v) = settle_delay_secs {
                cfg.settle_delay_secs = v;
            }
            let options = cfg.processing_options()?;
            tracing::info!(input = %cfg.input_dir.display(), output = %cfg.output_dir.display(), "watching");

            let poller = DirectoryPoller::new(&cfg.input_dir, cfg.poll_interval(), cfg.settle_delay())?;
            let sink = DirectorySink::new(&cfg.output_dir);
            Watcher::new(poller, sink, options, cfg.poll_interval()).run_until(|| false);
        }
        Command::Handle {
            input_dir,
            output_dir,
        } => {
            override_dirs(&mut cfg, input_dir, output_dir);
            let options = cfg.processing_options()?;
            let input = LocalObjectStore::new(&cfg.input_dir);
            let output = LocalObjectStore::new(&cfg.output_dir);
            let now = chrono::Local::now().naive_local();
            match handle_latest(&input, &output, &options, now) {
                Ok(Some(done)) => tracing::info!(input = %done.input_key, output = %done.output_key, "done"),
                Ok(None) => {}
                Err(e) if e.is_unsupported_format() => tracing::debug!("latest object not supported; nothing processed"),
                Err(e) => return Err(e).context("handler failed"),
            }
        }
        Command::Process { file, output_dir } => {
            override_dirs(&mut cfg, None, output_dir);
            let options = cfg.processing_options()?;
            let now = chrono::Local::now().naive_local();
            let processed = process_path(&file, &options, now)
                .with_context(|| format!("processing {}", file.display()))?;
            let dest = DirectorySink::new(&cfg.output_dir).write(&processed.output_name, &processed.contents)?;
            println!("{dest}");
        }
    }
    Ok(())
}

fn override_dirs(cfg: &mut AppConfig, input_dir: Option<PathBuf>, output_dir: Option<PathBuf>) {
    if let Some(d) = input_dir {
        cfg.input_dir = d;
    }
    if let Some(d) = output_dir {
        cfg.output_dir = d;
    }
}
