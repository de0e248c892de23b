//! Preety Post CLI
//!
//! ```bash
//! # Export a card into the current directory
//! preety-post export --name "Ada" --handle ada --body "Hello world" --random-background
//!
//! # Export from a JSON draft, overriding the picture
//! preety-post export --draft card.json --image avatar.jpg --out-dir ~/Downloads
//!
//! # Print the card SVG
//! preety-post svg --name "Ada" --body "Hello world"
//!
//! # List background keys
//! preety-post backgrounds
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use preety_post::{
    Background, CardDraft, CompositionStore, Configurable, DirectoryDownloader, ExportOutcome,
    ExportPipeline, Notice, Rasterizer, ResvgRasterizer, render_card_with,
};
use tracing::debug;

/// Create beautiful X post cards with your content
#[derive(Parser)]
#[command(name = "preety-post", version)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the card and save it as a PNG
    Export {
        #[command(flatten)]
        card: CardArgs,

        /// Directory the PNG is saved into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Linear scale over the card's natural size
        #[arg(long)]
        scale: Option<f32>,
    },

    /// Print the card as SVG
    Svg {
        #[command(flatten)]
        card: CardArgs,
    },

    /// List the available backgrounds
    Backgrounds,
}

#[derive(Args)]
struct CardArgs {
    /// JSON draft to start from
    #[arg(long)]
    draft: Option<PathBuf>,

    /// Display name
    #[arg(long)]
    name: Option<String>,

    /// Username, shown with a leading @
    #[arg(long)]
    handle: Option<String>,

    /// Post content
    #[arg(long)]
    body: Option<String>,

    /// Profile picture
    #[arg(long)]
    image: Option<PathBuf>,

    /// Background key (see `backgrounds`)
    #[arg(long, conflicts_with = "random_background")]
    background: Option<Background>,

    /// Pick a random background
    #[arg(long)]
    random_background: bool,
}

impl CardArgs {
    async fn build(&self) -> Result<(CompositionStore, CardDraft)> {
        let draft = match &self.draft {
            Some(path) => {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading draft {}", path.display()))?;
                CardDraft::from_json(&json)
                    .with_context(|| format!("parsing draft {}", path.display()))?
            }
            None => CardDraft::new(),
        };

        let mut store = CompositionStore::new();
        store.apply_draft(&draft);

        if let Some(name) = &self.name {
            store.set_display_name(name.clone());
        }
        if let Some(handle) = &self.handle {
            store.set_handle(handle.clone());
        }
        if let Some(body) = &self.body {
            store.set_body(body.clone());
        }
        if let Some(background) = self.background {
            store.set_background(background);
        }
        if self.random_background {
            let picked = store.randomize_background();
            debug!(background = %picked, "picked random background");
        }

        let image = self.image.as_deref().or(draft.profile_image.as_deref());
        store.upload_profile_image(image).await?;

        Ok((store, draft))
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_notice(notice: Notice) {
    println!("{notice}");
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Export {
            card,
            out_dir,
            scale,
        } => {
            let (store, draft) = card.build().await?;
            let mut settings = draft.export;
            if let Some(scale) = scale {
                settings.scale = scale;
            }

            let pipeline = ExportPipeline::new(
                ResvgRasterizer::new(),
                DirectoryDownloader::new(out_dir),
                print_notice,
            )
            .with_settings(settings);

            match pipeline.export(store.state()).await {
                Ok(ExportOutcome::Downloaded(path)) => {
                    println!("{}", path.display());
                    Ok(ExitCode::SUCCESS)
                }
                Ok(ExportOutcome::Refused | ExportOutcome::Aborted) => Ok(ExitCode::FAILURE),
                Err(e) => {
                    debug!(error = %e, "export error");
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Svg { card } => {
            let (store, _) = card.build().await?;
            let rasterizer = ResvgRasterizer::new();
            println!("{}", render_card_with(store.state(), rasterizer.text_metrics()).svg());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Backgrounds => {
            for background in Background::ALL {
                let marker = if background == Background::default() { " (default)" } else { "" };
                println!("{background}{marker}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
