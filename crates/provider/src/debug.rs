//! Debug-reattach rendezvous
//!
//! When a debugger hosts the plugin in-process instead of letting the
//! orchestrator spawn it, the server is started here and the caller waits
//! for its handshake configuration on a single-shot channel with a fixed
//! deadline. No polling loop; the server either reports in time or the
//! bootstrap fails.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Error, Result};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection details a debugger needs to reattach to an in-process server.
#[derive(Debug, Clone)]
pub struct ReattachConfig {
    pub protocol: String,
    pub pid: u32,
    pub network: String,
    pub addr: String,
    pub test: bool,
}

/// A running in-process plugin server.
pub struct DebugServer {
    pub config: ReattachConfig,
    close: CancellationToken,
}

impl DebugServer {
    /// Signal observed by the serve future; fires when the host wants the
    /// server gone.
    pub fn close_signal(&self) -> CancellationToken {
        self.close.clone()
    }

    pub fn shutdown(&self) {
        self.close.cancel();
    }
}

/// Start `serve` in-process and wait for its handshake configuration.
///
/// The serve future receives the one-shot sender it must report its
/// [`ReattachConfig`] on, plus the close signal it must observe. Fails with
/// [`Error::ReattachTimeout`] if no config arrives within the deadline, or
/// [`Error::ReattachDropped`] if the server exits without sending one.
pub async fn debug_serve<F, Fut>(serve: F) -> Result<DebugServer>
where
    F: FnOnce(oneshot::Sender<ReattachConfig>, CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (config_tx, config_rx) = oneshot::channel();
    let close = CancellationToken::new();
    tokio::spawn(serve(config_tx, close.clone()));

    let config = match tokio::time::timeout(HANDSHAKE_TIMEOUT, config_rx).await {
        Err(_elapsed) => return Err(Error::ReattachTimeout),
        Ok(Err(_dropped)) => return Err(Error::ReattachDropped),
        Ok(Ok(config)) => config,
    };

    info!(addr = %config.addr, pid = config.pid, "debug server reattach config received");
    Ok(DebugServer { config, close })
}
