use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use festive_lens::capture::{CaptureError, FilePicker, ShareSheet, TracingAlerts};
use festive_lens::client::{FunctionsConfig, FunctionsHttp};
use festive_lens::editor::{CaptureResult, Collaborators, EditorSession};
use festive_lens::service::{ServiceConfig, TransformService, server};
use festive_lens::{Filter, SizePx, generate_prompt};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "festive-lens", about = "Christmas photo filters and the transform function")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the transform function over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: SocketAddr,
    },
    /// Print the prompt generated for a filter list.
    Prompt { filters: Vec<String> },
    /// Draw overlays onto a local photo and write a PNG.
    Preview {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Comma-separated filter ids.
        #[arg(long, value_delimiter = ',')]
        filters: Vec<Filter>,
        /// Animation time to render at.
        #[arg(long, default_value_t = 0.0)]
        time_ms: f64,
        #[arg(long, default_value_t = 360)]
        width: u32,
        #[arg(long, default_value_t = 400)]
        height: u32,
    },
    /// Send a local photo to the deployed transform function.
    Transform {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_delimiter = ',')]
        filters: Vec<Filter>,
        #[arg(long)]
        prompt: Option<String>,
    },
}

/// Sharing is never available from a terminal.
struct NoShare;

#[async_trait]
impl ShareSheet for NoShare {
    async fn is_available(&self) -> bool {
        false
    }

    async fn share(&self, _uri: &str, _dialog_title: &str) -> Result<(), CaptureError> {
        Err(CaptureError::Share("no share sheet".into()))
    }
}

fn functions_from_env() -> FunctionsConfig {
    let var = |name: &str| std::env::var(name).unwrap_or_default();
    let config = FunctionsConfig::new(var("SUPABASE_URL"), var("SUPABASE_ANON_KEY"));
    match std::env::var("SUPABASE_ACCESS_TOKEN") {
        Ok(token) if !token.is_empty() => config.with_access_token(token),
        _ => config,
    }
}

async fn open_session(input: PathBuf, container: SizePx) -> anyhow::Result<EditorSession> {
    let collaborators = Collaborators {
        picker: Arc::new(FilePicker::new(input)),
        alerts: Arc::new(TracingAlerts),
        share: Arc::new(NoShare),
        functions: Arc::new(FunctionsHttp::new(functions_from_env())),
    };
    let mut session = EditorSession::with_container(collaborators, container);
    match session.pick_image().await {
        CaptureResult::Captured => Ok(session),
        other => bail!("could not load photo: {other:?}"),
    }
}

fn select(session: &mut EditorSession, filters: &[Filter]) {
    for &filter in filters {
        if !session.selection().contains(filter) {
            session.toggle_filter(filter);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("festive_lens=info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve { addr } => {
            let config = ServiceConfig::from_env().context("reading service configuration")?;
            let service = Arc::new(TransformService::from_config(config));
            server::serve(addr, service).await?;
        }
        Command::Prompt { filters } => {
            println!("{}", generate_prompt(&filters));
        }
        Command::Preview {
            input,
            output,
            filters,
            time_ms,
            width,
            height,
        } => {
            let size = SizePx::new(width, height);
            let mut session = open_session(input, size).await?;
            select(&mut session, &filters);
            session.on_layout(size);
            session.animator().set_time(time_ms);

            let photo = session
                .render_preview()?
                .context("nothing to render at this size")?;
            std::fs::write(&output, photo.to_png()?)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(output = %output.display(), "preview written");
        }
        Command::Transform {
            input,
            filters,
            prompt,
        } => {
            let mut session = open_session(input, SizePx::new(360, 400)).await?;
            select(&mut session, &filters);
            match session.request_transform(prompt).await {
                Some(response) => println!("{}", response.to_json()?),
                None => bail!(
                    "{}",
                    session.transform_client().error().unwrap_or("transformation failed")
                ),
            }
        }
    }

    Ok(())
}
