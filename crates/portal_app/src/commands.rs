//! One function per subcommand. Each returns `Ok(false)` when the operation
//! finished but surfaced a user-facing error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use portal_core::DashboardView;
use portal_engine::{
    load_dashboard, ApiError, ApplicationSource, ConnectionController, ExtensionProbe,
    FixedExtensionProbe, PortalSettings, ReqwestPortalClient, ResumeUpload, TcpExtensionProbe,
    UploadController, UploadSettings, WsRelayConnector,
};
use portal_logging::{portal_info, portal_warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cli::Command;
use crate::config::PortalConfig;
use crate::render;

const EXTENSION_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub async fn run(command: Command, config: &PortalConfig) -> Result<bool> {
    match command {
        Command::Dashboard => dashboard(config).await,
        Command::Resumes => resumes(config).await,
        Command::Upload { path } => upload(config, &path).await,
        Command::Delete { name, yes } => delete(config, &name, yes).await,
        Command::Relay {
            assume_extension, ..
        } => relay(config, assume_extension).await,
    }
}

fn portal_client(config: &PortalConfig) -> Result<ReqwestPortalClient> {
    let settings = PortalSettings {
        base_url: config.server_url.clone(),
        ..PortalSettings::default()
    };
    ReqwestPortalClient::new(settings).context("failed to build the dashboard client")
}

fn upload_controller(config: &PortalConfig) -> Result<UploadController> {
    let api = Arc::new(portal_client(config)?);
    Ok(UploadController::new(
        api,
        UploadSettings {
            settle_delay: config.settle_delay(),
        },
    ))
}

async fn dashboard(config: &PortalConfig) -> Result<bool> {
    let client = portal_client(config)?;
    let (view, failure) = dashboard_view(&client, &Local::now()).await;
    print!("{}", render::render_dashboard(&view, &Local));
    match failure {
        Some(err) => {
            eprintln!("Error: failed to load applications: {err}");
            Ok(false)
        }
        None => Ok(true),
    }
}

/// A failed load still yields a view: no rows and no series.
async fn dashboard_view<Tz: TimeZone>(
    source: &dyn ApplicationSource,
    now: &DateTime<Tz>,
) -> (DashboardView, Option<ApiError>) {
    match load_dashboard(source, now).await {
        Ok(view) => (view, None),
        Err(err) => {
            portal_warn!("failed to load applications: {}", err);
            (DashboardView::default(), Some(err))
        }
    }
}

async fn resumes(config: &PortalConfig) -> Result<bool> {
    let controller = upload_controller(config)?;
    let status = controller.refresh().await;
    if let Some(error) = &status.error {
        eprintln!("Error: {error}");
        return Ok(false);
    }
    print!("{}", render::render_resumes(&status.resumes, &Local));
    Ok(true)
}

async fn upload(config: &PortalConfig, path: &Path) -> Result<bool> {
    let file = ResumeUpload::from_path(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let controller = upload_controller(config)?;

    let mut rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            if status.is_uploading && last != Some(status.progress) {
                last = Some(status.progress);
                eprintln!("{}", render::render_upload_status(&status));
            }
        }
    });

    let status = controller.submit(vec![file]).await;
    printer.abort();
    if let Err(err) = printer.await {
        if !err.is_cancelled() {
            portal_warn!("progress printer stopped: {}", err);
        }
    }

    if let Some(error) = &status.error {
        eprintln!("Error: {error}");
        return Ok(false);
    }
    println!("Uploaded {}", path.display());
    print!("{}", render::render_resumes(&status.resumes, &Local));
    Ok(true)
}

async fn delete(config: &PortalConfig, name: &str, yes: bool) -> Result<bool> {
    if !yes && !confirm(&format!("Are you sure you want to delete {name}?")).await? {
        println!("Cancelled");
        return Ok(true);
    }
    let controller = upload_controller(config)?;
    let status = controller.remove(name).await;
    if let Some(error) = &status.error {
        eprintln!("Error: {error}");
        return Ok(false);
    }
    println!("Deleted {name}");
    print!("{}", render::render_resumes(&status.resumes, &Local));
    Ok(true)
}

async fn confirm(question: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{question} [y/N] ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn relay(config: &PortalConfig, assume_extension: bool) -> Result<bool> {
    let controller = ConnectionController::new(Arc::new(WsRelayConnector::new()));
    let probe: Box<dyn ExtensionProbe> = if assume_extension {
        Box::new(FixedExtensionProbe(true))
    } else {
        Box::new(TcpExtensionProbe::new(
            config.relay_url.clone(),
            config.probe_timeout(),
        ))
    };

    let status = controller.refresh_extension(probe.as_ref()).await;
    if !status.extension_installed {
        eprintln!("{}", render::render_connection(&status));
        eprintln!("Please install the browser bridge extension first");
        return Ok(false);
    }

    let status = controller.connect(&config.relay_url).await;
    println!("{}", render::render_connection(&status));
    if !status.connected {
        return Ok(false);
    }
    portal_info!("holding relay session until interrupted");

    let mut poll = tokio::time::interval(EXTENSION_POLL_INTERVAL);
    poll.tick().await;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            _ = poll.tick() => {
                let before = controller.status();
                let after = controller.refresh_extension(probe.as_ref()).await;
                if before != after {
                    println!("{}", render::render_connection(&after));
                }
            }
        }
    }

    let status = controller.disconnect().await;
    println!("{}", render::render_connection(&status));
    Ok(status.error.is_none())
}
