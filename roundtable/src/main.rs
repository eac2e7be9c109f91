//! Roundtable CLI
//!
//! Runs one debate from the command line:
//! - Streams each model's output as it generates
//! - Benches rate-limited backends and keeps going with whoever is left
//! - Prints the final answer and the debate summary at the end
//!
//! # Usage
//!
//! ```bash
//! # Plain debate
//! roundtable "Why is the sky blue?"
//!
//! # Attachments and a shorter debate
//! roundtable --image chart.png --pdf paper.pdf --max-rounds 3 "Summarize the evidence"
//!
//! # Raw SSE frames on stdout, for piping into another process
//! roundtable --sse "Is P equal to NP?"
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::Parser;

use roundtable::{
    encode_sse, BackendCredentials, BackendSet, DebateConfig, DebateEvent, DebateOrchestrator,
    DebateRequest, DebateStatus, DocumentAttachment, EventChannel, EventStream, ImageAttachment,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Question for the models to debate
    prompt: String,

    /// Image file to attach (repeatable)
    #[arg(long, value_name = "FILE")]
    image: Vec<PathBuf>,

    /// PDF file to attach (repeatable)
    #[arg(long, value_name = "FILE")]
    pdf: Vec<PathBuf>,

    /// Maximum debate rounds before the synthesis turn
    #[arg(long, default_value_t = 5)]
    max_rounds: u32,

    /// Emit raw SSE frames instead of readable output
    #[arg(long, default_value_t = false)]
    sse: bool,
}

fn image_mime_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => bail!(
            "unsupported image type: {} (expected jpg, png, gif, or webp)",
            path.display()
        ),
    }
}

fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageAttachment>> {
    paths
        .iter()
        .map(|path| {
            let mime_type = image_mime_type(path)?;
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            Ok(ImageAttachment {
                data: BASE64.encode(&bytes),
                mime_type: mime_type.to_string(),
            })
        })
        .collect()
}

fn load_documents(paths: &[PathBuf]) -> Result<Vec<DocumentAttachment>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read PDF {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document.pdf")
                .to_string();
            Ok(DocumentAttachment {
                data: BASE64.encode(&bytes),
                name,
            })
        })
        .collect()
}

/// Drain the event stream, rendering to stdout until the debate ends.
async fn render_events(mut stream: EventStream, sse: bool) -> Result<()> {
    let mut stdout = std::io::stdout();
    // Whether the current turn has produced chunks; turns that resolve
    // without streaming (reused answers) print their content on completion.
    let mut streamed = false;

    while let Some(event) = stream.recv().await {
        if sse {
            let frame = encode_sse(&event)?;
            stdout.write_all(frame.as_bytes())?;
            stdout.flush()?;
            continue;
        }

        match &event {
            DebateEvent::RoundStart { round } => {
                println!("\n=== Round {} ===", round);
            }
            DebateEvent::ModelStart { backend_id, .. } => {
                streamed = false;
                println!("\n--- {} ---", backend_id.display_name());
            }
            DebateEvent::ModelChunk { chunk, .. } => {
                streamed = true;
                stdout.write_all(chunk.as_bytes())?;
                stdout.flush()?;
            }
            DebateEvent::ModelComplete { content, .. } => {
                if !streamed && !content.is_empty() {
                    println!("{}", content);
                } else {
                    println!();
                }
            }
            DebateEvent::AgreementCheck {
                backend_id,
                verdict,
                ..
            } => match verdict {
                Some(verdict) => println!("[{}: {}]", backend_id.display_name(), verdict),
                None => println!("[{}: no verdict]", backend_id.display_name()),
            },
            DebateEvent::ModelError { error, .. } => {
                eprintln!("\n! {}", error);
            }
            DebateEvent::DebateComplete {
                final_answer,
                summary,
                all_agree,
            } => {
                let outcome = if *all_agree {
                    "consensus"
                } else {
                    "no consensus"
                };
                println!("\n=== Final Answer ({}) ===\n{}", outcome, final_answer);
                println!("\n=== Debate Summary ===\n{}", summary);
            }
            DebateEvent::Error { error } => {
                eprintln!("\nDebate failed: {}", error);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roundtable=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let credentials = BackendCredentials::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load API keys: {}", e))?;
    let backends = BackendSet::from_credentials(&credentials);
    let orchestrator = DebateOrchestrator::with_config(
        backends,
        DebateConfig {
            max_rounds: args.max_rounds,
        },
    );

    let request = DebateRequest::new(args.prompt)
        .with_images(load_images(&args.image)?)
        .with_documents(load_documents(&args.pdf)?);

    let (channel, stream) = EventChannel::new();
    let renderer = tokio::spawn(render_events(stream, args.sse));

    let run = orchestrator.run(request, &channel).await?;
    channel.close();
    renderer.await??;

    if run.status == DebateStatus::Error {
        bail!(run
            .error_message
            .unwrap_or_else(|| "debate failed".to_string()));
    }
    Ok(())
}
