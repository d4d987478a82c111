mod api;
mod auth;
mod config;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::{ServerConfig, ServiceConfig};
use pdf_vector_core::{discover_pdf_files, ChunkingOptions, DeleteOutcome, IngestionSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-vector", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceConfig,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and serve the frontend.
    Serve(ServerConfig),
    /// Ingest a PDF, or every PDF below a folder, into the collection.
    Ingest {
        /// PDF file or folder that contains PDFs recursively.
        #[arg(long)]
        file: PathBuf,
        /// Words per chunk.
        #[arg(long)]
        chunk_size: Option<i64>,
        /// Words between chunk starts.
        #[arg(long)]
        chunk_stride: Option<i64>,
    },
    /// Print the nearest chunks for a query.
    Search {
        #[arg(long)]
        query: String,
    },
    /// Delete the collection named by `--collection`.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        ollama = %cli.service.ollama_url,
        chroma = %cli.service.chroma_url,
        collection = %cli.service.collection,
        "pdf-vector boot"
    );

    let service = cli.service.build_service()?;

    match cli.command {
        Command::Serve(server) => serve(service, server).await?,
        Command::Ingest {
            file,
            chunk_size,
            chunk_stride,
        } => {
            let options = ChunkingOptions::with_overrides(chunk_size, chunk_stride);
            let files = if file.is_dir() {
                discover_pdf_files(&file)
            } else {
                vec![file]
            };
            if files.is_empty() {
                println!("0 PDF files found");
            }

            for path in files {
                let filename = display_name(&path);
                match service.ingest(&path, &filename, options).await {
                    Ok(summary) => print_summary(&summary),
                    Err(error) => {
                        warn!(path = %path.display(), %error, "ingestion failed");
                        println!("{filename}: failed: {error}");
                    }
                }
            }
        }
        Command::Search { query } => {
            let result = service.search(&query).await?;
            println!("query: {query}");
            for hit in result.hits() {
                println!(
                    "[{}] distance={} file={} chunk={}",
                    hit.rank,
                    hit.distance
                        .map(|distance| format!("{distance:.4}"))
                        .unwrap_or_else(|| "-".to_string()),
                    hit.filename().unwrap_or("-"),
                    hit.chunk_num()
                        .map(|chunk| chunk.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                );
                if let Some(text) = &hit.document {
                    println!("  {text}");
                }
            }
        }
        Command::Reset => {
            let name = service.settings().collection.clone();
            match service.reset().await? {
                DeleteOutcome::Deleted => println!("collection '{name}' deleted"),
                DeleteOutcome::NotFound => println!("collection '{name}' did not exist"),
            }
        }
    }

    Ok(())
}

async fn serve(service: config::Service, server: ServerConfig) -> anyhow::Result<()> {
    let auth = Arc::new(auth::JwtAuth::new(
        &server.admin_username,
        &server.admin_password,
        &server.jwt_secret,
    ));
    let frontend = server
        .frontend_dir
        .is_dir()
        .then(|| server.frontend_dir.clone());
    if frontend.is_none() {
        warn!(dir = %server.frontend_dir.display(), "frontend directory not found, serving API only");
    }

    let options = api::RouterOptions {
        frontend_dir: frontend,
        upload_limit: server.upload_limit(),
    };
    let router = api::create_router(Arc::new(service), auth, options);
    let listener = TcpListener::bind(("0.0.0.0", server.port))
        .await
        .with_context(|| format!("failed to bind port {}", server.port))?;
    info!(port = server.port, "server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(summary: &IngestionSummary) {
    println!(
        "{}: {} of {} chunks stored (size={}, stride={})",
        summary.filename,
        summary.chunks_stored,
        summary.chunks_total,
        summary.chunk_size,
        summary.chunk_stride
    );
    for failure in &summary.failures {
        println!(
            "  chunk {} dropped at {:?}: {}",
            failure.chunk, failure.stage, failure.reason
        );
    }
}
