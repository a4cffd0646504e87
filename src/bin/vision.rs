use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use media_prompt::cli::{init_logging, load_upload, present, resolve_prompt};
use media_prompt::{Config, Form, GeminiClient, GeminiClientConfig, MediaKind, Variant};

#[derive(Parser, Debug)]
#[command(name = "vision")]
#[command(version)]
#[command(about = "Ask Gemini about an image using the Generative Language API")]
#[command(after_help = "ENVIRONMENT:
    GOOGLE_API_KEY    API key for generativelanguage.googleapis.com (.env is honored)

EXAMPLES:
    vision --prompt \"Describe this image\" --image photo.jpg
    vision --image photo.png            (prompt is read from stdin)
    vision --list-models")]
struct Args {
    /// Prompt text; read from stdin when omitted
    #[arg(short, long)]
    prompt: Option<String>,

    /// Image to analyze (jpg, jpeg, png)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Model to use
    #[arg(short, long, default_value = media_prompt::VISION_MODEL)]
    model: String,

    /// Print the models that support generateContent and exit
    #[arg(long)]
    list_models: bool,

    /// API timeout in seconds
    #[arg(short, long, default_value = "120")]
    timeout: u64,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only print generated text)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = Config::from_env();
    debug!("Loaded configuration: {:?}", config);

    let client_config = GeminiClientConfig {
        timeout_secs: args.timeout,
        ..GeminiClientConfig::default()
    };
    let client = GeminiClient::direct_with_config(&config, &args.model, client_config)
        .context("Failed to create Gemini client")?;

    if args.list_models {
        let models = client.list_models().await.context("Failed to list models")?;
        for model in models {
            println!("{}", model.name);
        }
        return Ok(());
    }

    let image = load_upload(MediaKind::Image, args.image.as_deref()).await?;
    let prompt = resolve_prompt(args.prompt)?;

    let mut form = Form::new(prompt);
    if let Some(image) = image {
        form = form.with_image(image);
    }

    present(&client, Variant::Vision, &form, args.quiet).await
}
