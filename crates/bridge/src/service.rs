//! Line protocol service
//!
//! Two execution contexts share one [`SharedBridge`]: the command loop reads
//! lines and writes one JSON result per line, and the hotplug consumer turns
//! arrival/removal signals into device events on a separate writer. Guarded
//! transport work runs on the blocking pool so neither context stalls the
//! runtime.

use crate::dispatcher::SharedBridge;
use anyhow::{Context, Result};
use common::HotplugReceiver;
use protocol::Transport;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Dispatch every line of `input` in order, writing results to `output`
///
/// Returns at end of input. Each command completes before the next line
/// is read, so nothing is left in flight on return.
pub async fn run_commands<T, R, W>(bridge: SharedBridge<T>, input: R, mut output: W) -> Result<()>
where
    T: Transport + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        let bridge = bridge.clone();
        let result = tokio::task::spawn_blocking(move || bridge.dispatch(&line))
            .await
            .context("Command task failed")?;

        output
            .write_all(format!("{}\n", result.to_json()).as_bytes())
            .await
            .context("Failed to write result")?;
        output.flush().await.context("Failed to write result")?;
    }

    debug!("End of command input");
    Ok(())
}

/// Refresh the device snapshot and emit events for the changes
pub async fn emit_device_changes<T, W>(bridge: &SharedBridge<T>, events: &mut W) -> Result<()>
where
    T: Transport + 'static,
    W: AsyncWrite + Unpin,
{
    let bridge = bridge.clone();
    let changes = tokio::task::spawn_blocking(move || bridge.refresh_devices())
        .await
        .context("Refresh task failed")?;

    for event in changes {
        events
            .write_all(format!("{}\n", event.to_json()).as_bytes())
            .await?;
    }
    events.flush().await?;
    Ok(())
}

/// Handle to the running hotplug consumer
pub struct HotplugConsumer {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HotplugConsumer {
    /// Start consuming hotplug signals, refreshing on each one
    pub fn spawn<T, W>(bridge: SharedBridge<T>, receiver: HotplugReceiver, mut events: W) -> Self
    where
        T: Transport + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (shutdown, mut stop) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    signal = receiver.recv() => match signal {
                        Ok(signal) => {
                            debug!("Hot-plug signal: {:?}", signal);
                            if let Err(e) = emit_device_changes(&bridge, &mut events).await {
                                warn!("Failed to emit device events: {:#}", e);
                            }
                        }
                        Err(_) => {
                            debug!("Hot-plug source closed");
                            break;
                        }
                    },
                }
            }
        });

        Self { shutdown, task }
    }

    /// Stop after any refresh in progress completes
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Hot-plug consumer failed: {}", e);
        }
        info!("Hot-plug consumer stopped");
    }
}
