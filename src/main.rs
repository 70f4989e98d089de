//! CLI entry point for the LeanKit client.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use leankit_client::{
    Attachment, AttachmentDownload, ClientConfig, FilePayload, LeanKitClient, ProxyConfig,
};
use serde_json::Value;
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(command = ?args.command, "CLI arguments parsed");

    let client = LeanKitClient::new(build_config(&args)?)?;

    let output = match args.command {
        Command::Board => client.get_board().await?,
        Command::Archive => client.get_board_archive().await?,
        Command::Card { card_id } => client.get_card(card_id).await?,
        Command::History { card_id } => client.get_card_history(card_id).await?,
        Command::Comments { card_id } => client.get_comments(card_id).await?,
        Command::Comment { card_id, text } => client.post_comment(card_id, &text).await?,
        Command::Attachments { card_id } => client.get_attachment_list(card_id).await?,
        Command::Upload {
            card_id,
            file,
            description,
        } => {
            let payload = read_payload(&file, description).await?;
            client.post_attachment(card_id, payload).await?
        }
        Command::Download {
            attachment_id,
            path,
        } => {
            let (written, bytes) = client.download_attachment(attachment_id, &path).await?;
            serde_json::json!({ "path": written, "bytes": bytes })
        }
        Command::DownloadAll { card_id, dir } => download_all(&client, card_id, &dir).await?,
        Command::Assign {
            card_id,
            user_id,
            override_comment,
        } => {
            client
                .assign_user(card_id, user_id, override_comment.as_deref())
                .await?
        }
        Command::Unassign { card_id, user_id } => client.unassign_user(card_id, user_id).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .use_session(args.session)
        .dry_run(args.dry_run)
        .concurrency(usize::from(args.concurrency));

    if let Some(email) = &args.email {
        builder = builder.email(email);
    }
    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    if let Some(host) = &args.host {
        builder = builder.host(host);
    }
    if let Some(board) = &args.board {
        builder = builder.board_id(board);
    }
    if let Some(proxy_host) = &args.proxy_host {
        let mut proxy = ProxyConfig::new(proxy_host);
        if let (Some(user), Some(pass)) = (&args.proxy_user, &args.proxy_pass) {
            proxy = proxy.with_credentials(user, pass);
        }
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

async fn read_payload(file: &Path, description: Option<String>) -> Result<FilePayload> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", file.display()))?;

    let payload = FilePayload::new(data, filename);
    Ok(match description {
        Some(description) => payload.with_description(description),
        None => payload,
    })
}

/// Lists a card's attachments and fetches them all into `dir`.
async fn download_all(client: &LeanKitClient, card_id: u64, dir: &Path) -> Result<Value> {
    let listing = client.get_attachment_list(card_id).await?;
    let attachments =
        Attachment::list_from_value(listing).context("unexpected attachment list shape")?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let items: Vec<AttachmentDownload> = attachments
        .iter()
        .map(|a| AttachmentDownload::new(a.id, attachment_destination(dir, a)))
        .collect();
    let total = items.len();
    let files: Vec<PathBuf> = items.iter().map(|item| item.path.clone()).collect();

    info!(card_id, total, dir = %dir.display(), "downloading attachments");
    client.download_bulk_attachments(items).await?;

    Ok(serde_json::json!({
        "downloaded": total,
        "files": files,
    }))
}

/// `dir/{id}-{name}`: the id keeps same-named attachments apart, and only the
/// final component of the server-supplied name is used so files stay in `dir`.
fn attachment_destination(dir: &Path, attachment: &Attachment) -> PathBuf {
    let name = Path::new(&attachment.file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.is_empty() {
        dir.join(attachment.id.to_string())
    } else {
        dir.join(format!("{}-{name}", attachment.id))
    }
}
