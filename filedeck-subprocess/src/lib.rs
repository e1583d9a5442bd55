use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use filedeck_core::watch::ChangeEvent;
use filedeck_core::{RequestEnvelope, ServiceMessage, SettingsManager, WorkspaceService};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::{io, io::AsyncWriteExt};
use tracing::{info, warn};

/// Serves the workspace protocol over stdin/stdout until stdin closes.
///
/// Each request runs on its own task, so a slow read never holds up a
/// `stop_watching`. All output goes through a single writer task.
pub async fn run_subprocess(settings_path: Option<String>) -> anyhow::Result<()> {
    let settings = match settings_path {
        Some(path) => SettingsManager::from_path(PathBuf::from(path))?,
        None => SettingsManager::new()?,
    };
    info!("Loaded settings from {}", settings.path().display());

    let service = Arc::new(
        WorkspaceService::new(settings.settings()).context("Failed to start workspace service")?,
    );
    let (tx, rx) = mpsc::unbounded_channel::<ServiceMessage>();

    let writer = tokio::spawn(write_messages(rx));
    let forwarder = tokio::spawn(forward_changes(service.subscribe().await, tx.clone()));

    let result = read_requests(service.clone(), tx).await;

    service.shutdown().await;
    forwarder.abort();
    let _ = forwarder.await;
    writer.await.context("writer task panicked")??;

    result
}

async fn write_messages(mut rx: mpsc::UnboundedReceiver<ServiceMessage>) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    while let Some(message) = rx.recv().await {
        let json = serde_json::to_string(&message)?;
        let json = format!("{json}\n");
        stdout.write_all(json.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn forward_changes(
    mut events: broadcast::Receiver<ChangeEvent>,
    tx: mpsc::UnboundedSender<ServiceMessage>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if tx.send(ServiceMessage::FileChanged(event)).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Dropped {skipped} change events, consumer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn read_requests(
    service: Arc<WorkspaceService>,
    tx: mpsc::UnboundedSender<ServiceMessage>,
) -> anyhow::Result<()> {
    let mut stdin = BufReader::new(io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = stdin.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let envelope = match parse_line(&line) {
            Ok(envelope) => envelope,
            Err(message) => {
                tx.send(message)?;
                continue;
            }
        };

        let service = service.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            let reply = respond(&service, envelope).await;
            let _ = tx.send(reply);
        });

        // Reap finished requests so the set does not grow for the whole session
        while in_flight.try_join_next().is_some() {}
    }

    info!("stdin closed, finishing {} pending requests", in_flight.len());
    while in_flight.join_next().await.is_some() {}
    Ok(())
}

/// Parses one request line. Unparseable lines become an `invalid_request`
/// error, carrying the id when one can be recovered.
pub fn parse_line(line: &str) -> Result<RequestEnvelope, ServiceMessage> {
    serde_json::from_str(line).map_err(|e| {
        let id = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|value| value.get("id")?.as_u64());
        warn!("Rejected request line: {e}");
        ServiceMessage::invalid_request(id, e.to_string())
    })
}

pub async fn respond(service: &WorkspaceService, envelope: RequestEnvelope) -> ServiceMessage {
    ServiceMessage::reply(envelope.id, service.dispatch(envelope.request).await)
}
