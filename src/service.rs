//! Event service: keeps a device connected and routes its input.
//!
//! One loop owns the connection. Key presses and profile switches are
//! spawned so a slow action never delays the next event; knob rotations are
//! only queued, which is cheap enough to do inline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::app::App;
use crate::config::KEY_COUNT;
use crate::device::{Connection, Connector, DeviceEvent, ReconnectPolicy};
use crate::error::{LdError, Result};

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceExit {
    /// `max_attempts` connection attempts were used up.
    AttemptsExhausted,
}

/// Discover and connect, each step under `timeout`.
pub async fn connect(connector: &dyn Connector, timeout: Duration) -> Result<Connection> {
    let found = tokio::time::timeout(timeout, connector.discover())
        .await
        .map_err(|_| LdError::Timeout("device discovery".to_string()))??;
    debug!(path = %found.path, kind = %found.info.kind, "Device found");
    tokio::time::timeout(timeout, connector.connect(found))
        .await
        .map_err(|_| LdError::Timeout("device connection".to_string()))?
}

/// Run until the attempt budget is spent (forever when unbounded).
#[instrument(skip_all)]
pub async fn run(
    app: Arc<App>,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
) -> ServiceExit {
    let mut attempts: u32 = 0;
    let mut failures: u32 = 0;
    loop {
        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            warn!(attempts, "Giving up on device connection");
            return ServiceExit::AttemptsExhausted;
        }
        attempts += 1;

        match connect(connector.as_ref(), policy.connect_timeout).await {
            Ok(connection) => {
                failures = 0;
                let reason = serve(&app, connection).await;
                app.on_disconnect(reason.as_deref());
                tokio::time::sleep(policy.reconnect_delay).await;
            }
            Err(e) => {
                failures += 1;
                let delay = policy.delay_after(failures);
                if e.is_connection_error() {
                    app.status_line().set(format!("Connect failed: {e}"));
                } else {
                    warn!(error = %e, "Device gateway error");
                    app.status_line().set(format!("Device error: {e}"));
                }
                debug!(failures, delay_ms = delay.as_millis() as u64, "Retrying connection");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attach, render and consume events until the device goes away.
///
/// Returns the disconnect reason, if the device gave one.
async fn serve(app: &Arc<App>, connection: Connection) -> Option<String> {
    let Connection { gateway, events } = connection;
    info!(kind = %gateway.info().kind, "Device connected");
    app.attach_device(gateway);
    let outcome = app.read_config().await;
    app.render_profile(&outcome.config).await;
    consume(app, events).await
}

async fn consume(app: &Arc<App>, mut events: mpsc::Receiver<DeviceEvent>) -> Option<String> {
    while let Some(event) = events.recv().await {
        match event {
            DeviceEvent::ButtonDown { id } => {
                let app = Arc::clone(app);
                tokio::spawn(async move { app.handle_button(id).await });
            }
            DeviceEvent::TouchStart { keys } => {
                for key in keys.into_iter().filter(|k| *k < KEY_COUNT) {
                    let app = Arc::clone(app);
                    tokio::spawn(async move {
                        app.execute_shortcut(key).await;
                    });
                }
            }
            DeviceEvent::Rotate { knob, delta } => app.handle_rotate(knob, delta).await,
            DeviceEvent::Disconnected { reason } => return reason,
        }
    }
    Some("event stream closed".to_string())
}
