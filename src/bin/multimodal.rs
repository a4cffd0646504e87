use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use media_prompt::cli::{init_logging, load_upload, present, resolve_prompt};
use media_prompt::{
    Config, Form, GeminiClient, GeminiClientConfig, MediaKind, ProjectSession, Variant,
};

#[derive(Parser, Debug)]
#[command(name = "multimodal")]
#[command(version)]
#[command(about = "Ask Gemini about an image and/or a video through a Vertex AI project")]
#[command(after_help = "ENVIRONMENT:
    PROJECT_ID            Google Cloud project (required)
    LOCATION              Region, defaults to us-west1
    GOOGLE_ACCESS_TOKEN   Bearer token; minted with `gcloud auth application-default
                          print-access-token` when unset
    GOOGLE_API_KEY        Read for parity, not used by this backend

EXAMPLES:
    multimodal --prompt \"Summarize this clip\" --video clip.mp4
    multimodal --prompt \"Compare these\" --image frame.png --video clip.mp4")]
struct Args {
    /// Prompt text; read from stdin when omitted
    #[arg(short, long)]
    prompt: Option<String>,

    /// Image to analyze (jpg, jpeg, png)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Video to analyze (mp4, mpeg)
    #[arg(long)]
    video: Option<PathBuf>,

    /// Model to use
    #[arg(short, long, default_value = media_prompt::MULTIMODAL_MODEL)]
    model: String,

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

    // The session has to exist before the model handle can be bound to it.
    let session =
        ProjectSession::init(&config).context("Failed to initialize project session")?;

    let client_config = GeminiClientConfig {
        timeout_secs: args.timeout,
        ..GeminiClientConfig::default()
    };
    let client = GeminiClient::project_scoped_with_config(&session, &args.model, client_config)
        .context("Failed to create Gemini client")?;

    let image = load_upload(MediaKind::Image, args.image.as_deref()).await?;
    let video = load_upload(MediaKind::Video, args.video.as_deref()).await?;
    let prompt = resolve_prompt(args.prompt)?;

    let mut form = Form::new(prompt);
    if let Some(image) = image {
        form = form.with_image(image);
    }
    if let Some(video) = video {
        form = form.with_video(video);
    }

    present(&client, Variant::Multimodal, &form, args.quiet).await
}
