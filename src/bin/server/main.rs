#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! HTTP to SMTP mail relay server

use anyhow::{Context, Result};
use clap::Parser;
use mail_relay::infrastructure::{
    email::smtp::{SMTPConfig, SMTPMailer},
    http::{
        state::{AppConfig, AppState},
        HttpServer, HttpServerConfig,
    },
    storage::{AttachmentConfig, AttachmentStore},
};
use tracing::info;

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// The HTTP server configuration
    #[clap(flatten)]
    pub server: HttpServerConfig,

    /// The SMTP relay configuration
    #[clap(flatten)]
    pub smtp: SMTPConfig,

    /// The attachment storage configuration
    #[clap(flatten)]
    pub attachments: AttachmentConfig,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = load_environment() {
        eprintln!("Failed to load environment: {:#}", e);

        return Err(e);
    }

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!(
        "relaying mail through {}:{} as {}",
        args.smtp.host, args.smtp.port, args.smtp.from
    );

    let state = AppState::new(
        AppConfig {
            body_limit: args.server.body_limit,
        },
        SMTPMailer::new(args.smtp),
        AttachmentStore::new(args.attachments),
    );

    HttpServer::new(state, &args.server).await?.run().await
}

/// Loads the env file named by `CONFIG_PATH`, or `.env` when present.
#[mutants::skip]
fn load_environment() -> Result<()> {
    match std::env::var("CONFIG_PATH") {
        Ok(path) => {
            dotenvy::from_path(&path).with_context(|| format!("failed to read {}", path))?;
        }
        Err(_) => match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}
