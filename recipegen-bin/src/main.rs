use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use recipegen_core::{
    config::Config,
    generator::RecipeGenerator,
    session::{Utensil, UtensilToggles},
    transport::ScriptedTransport,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Recipe generator: streams a recipe for the ingredients you have", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RecipeArgs {
    #[arg(short, long, help = "Ingredients you have, e.g. \"100g de manteiga, 200ml de leite\"")]
    ingredients: String,
    #[arg(short, long = "utensil", help = "Utensil you have (oven, microwave, blender, grill); repeatable")]
    utensils: Vec<Utensil>,
}

impl RecipeArgs {
    fn utensil_names(&self) -> Vec<&'static str> {
        self.utensils
            .iter()
            .copied()
            .collect::<UtensilToggles>()
            .selected_names()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a recipe (prints text as it streams)
    Generate {
        #[command(flatten)]
        recipe: RecipeArgs,
        #[arg(long, help = "Config file (JSON or TOML)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Override endpoint base URL")]
        endpoint: Option<String>,
    },
    /// Print the prompt that would be sent
    Prompt {
        #[command(flatten)]
        recipe: RecipeArgs,
    },
    /// Re-run the stream parser over a captured response body
    Replay {
        file: PathBuf,
        #[arg(long, default_value_t = 64, help = "Bytes per simulated network chunk")]
        chunk_size: usize,
    },
}

fn load_config(path: Option<PathBuf>, endpoint: Option<String>) -> anyhow::Result<Config> {
    let mut cfg = match path {
        Some(p) => Config::from_path(p)?,
        None => Config::default(),
    };
    if let Some(base) = endpoint {
        cfg.endpoint.base_url = base;
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn stream_to_stdout(
    generator: RecipeGenerator,
    ingredients: &str,
    utensils: &[&str],
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let handle = generator.start_generation(ingredients, utensils);
    let mut text = handle.generated_text();
    let mut printed = 0usize;
    while text.changed().await.is_ok() {
        let current = text.borrow_and_update().clone();
        print!("{}", &current[printed..]);
        io::stdout().flush().ok();
        printed = current.len();
    }
    let outcome = handle.join().await?;
    let current = text.borrow().clone();
    print!("{}", &current[printed..]);
    println!();
    eprintln!(
        "[{}: {} fragments, finish: {:?}]",
        outcome.request_id, outcome.fragments, outcome.finish_reason
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            recipe,
            config,
            endpoint,
        } => {
            let cfg = load_config(config, endpoint)?;
            tracing::info!(url = %cfg.endpoint.url(), "generating recipe");
            let generator = RecipeGenerator::from_config(&cfg)?;
            stream_to_stdout(generator, &recipe.ingredients, &recipe.utensil_names()).await?;
        }
        Commands::Prompt { recipe } => {
            println!(
                "{}",
                recipegen_core::prompt::build_prompt(&recipe.ingredients, &recipe.utensil_names())
            );
        }
        Commands::Replay { file, chunk_size } => {
            let body = std::fs::read(&file)?;
            let transport = ScriptedTransport::split_every(&body, chunk_size);
            tracing::info!(chunks = transport.chunk_count(), "replaying captured body");
            // The prompt is irrelevant to a replay; the body is fixed.
            stream_to_stdout(RecipeGenerator::new(Arc::new(transport)), "", &[]).await?;
        }
    }

    Ok(())
}
