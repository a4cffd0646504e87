//! Terminal plumbing shared by the `vision` and `multimodal` binaries.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::content::{MediaKind, Upload};
use crate::dispatch::Variant;
use crate::frontend::{Form, preview, run_action};
use crate::gemini_api::{ContentModel, GeminiError};

pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Use the prompt given on the command line, or ask for one on stdin.
/// End of input means no prompt was entered.
pub fn resolve_prompt(prompt: Option<String>) -> Result<Option<String>> {
    if prompt.is_some() {
        return Ok(prompt);
    }

    eprint!("Enter a prompt OR/AND: ");
    std::io::stderr().flush().ok();

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read prompt from stdin")?;

    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub async fn load_upload(kind: MediaKind, path: Option<&Path>) -> Result<Option<Upload>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let upload = Upload::from_path(kind, path).await.with_context(|| {
        format!(
            "Could not load {:?} (accepted: {})",
            path,
            kind.accepted_extensions().join(", ")
        )
    })?;
    Ok(Some(upload))
}

fn spinner(quiet: bool, message: &'static str) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Render the form, then press every available action in order and print each reply.
pub async fn present<M: ContentModel>(
    model: &M,
    variant: Variant,
    form: &Form,
    quiet: bool,
) -> Result<()> {
    present_to(&mut std::io::stdout(), model, variant, form, quiet).await
}

/// [`present`] writing to `out`. In quiet mode only generated text is written.
pub async fn present_to<W: Write, M: ContentModel>(
    out: &mut W,
    model: &M,
    variant: Variant,
    form: &Form,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        writeln!(out, "{}\n", variant.title())?;
    }

    for upload in [&form.image, &form.video].into_iter().flatten() {
        if !quiet {
            writeln!(out, "{}", preview(upload))?;
        }
    }

    let actions = form.available_actions(variant);
    if actions.is_empty() {
        if !quiet {
            writeln!(out, "Enter a prompt and upload a file to analyze.")?;
        }
        return Ok(());
    }

    for action in actions {
        info!("Running action: {}", action.label());
        let pb = spinner(quiet, "Generating...");

        let result = run_action(model, variant, form, action).await;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        match result {
            Ok(Some(text)) => {
                if !quiet {
                    writeln!(out, "\n[{}]", action.label())?;
                }
                writeln!(out, "{}", text)?;
            }
            Ok(None) => {}
            Err(e @ GeminiError::UnsupportedKind { .. }) => {
                error!("{}", e);
                eprintln!("{}", e);
                std::process::exit(1);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("{} failed", action.label()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::ScriptedModel;

    #[tokio::test]
    async fn test_quiet_form_without_upload_prints_nothing() {
        let model = ScriptedModel::new("unused");
        let form = Form::new(Some("Describe this image".to_string()));
        let mut out = Vec::new();

        present_to(&mut out, &model, Variant::Vision, &form, true)
            .await
            .unwrap();

        assert!(out.is_empty(), "{}", String::from_utf8_lossy(&out));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hint_shown_when_not_quiet() {
        let model = ScriptedModel::new("unused");
        let form = Form::new(Some("Describe this image".to_string()));
        let mut out = Vec::new();

        present_to(&mut out, &model, Variant::Vision, &form, false)
            .await
            .unwrap();

        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.starts_with("Gemini AI Text Generator\n"));
        assert!(rendered.contains("Enter a prompt and upload a file to analyze."));
    }

    #[tokio::test]
    async fn test_quiet_output_is_only_generated_text() {
        let model = ScriptedModel::new("A red bicycle.");
        let image = Upload::from_bytes(MediaKind::Image, "bike.png", vec![1]).unwrap();
        let form = Form::new(Some("p".to_string())).with_image(image);
        let mut out = Vec::new();

        present_to(&mut out, &model, Variant::Vision, &form, true)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "A red bicycle.\n");
    }

    #[test]
    fn test_resolve_prompt_prefers_argument() {
        let prompt = resolve_prompt(Some("Describe this image".to_string())).unwrap();
        assert_eq!(prompt.as_deref(), Some("Describe this image"));
    }

    #[tokio::test]
    async fn test_load_upload_absent_path() {
        assert!(load_upload(MediaKind::Image, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_upload_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let err = load_upload(MediaKind::Image, Some(path.as_path())).await.unwrap_err();
        assert!(err.to_string().contains("jpg, jpeg, png"));
    }

    #[tokio::test]
    async fn test_load_upload_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();

        let upload = load_upload(MediaKind::Image, Some(path.as_path()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.size(), 4);
    }
}
