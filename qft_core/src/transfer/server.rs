use anyhow::{Context, Result};
use quinn::Endpoint;
use quinn::Incoming;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::constants::{CLOSE_FAILED, CLOSE_OK, CLOSE_SHUTDOWN};
use super::quic::make_server_endpoint;
use super::receiver::{ReceivedFile, handle_stream};
use crate::config::ServerConfig;
use crate::error::TransferError;

/// Lifecycle of the accept loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Listening,
    Running,
    ShuttingDown,
    Closed,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Listening => "listening",
            SupervisorState::Running => "running",
            SupervisorState::ShuttingDown => "shutting down",
            SupervisorState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Accepts connections and runs one transfer per connection in its own task
pub struct TransferServer {
    endpoint: Endpoint,
    upload_dir: PathBuf,
    shutdown: CancellationToken,
    state: watch::Sender<SupervisorState>,
}

impl TransferServer {
    /// Bind to `config.bind_addr`; the server stops once `shutdown` is cancelled
    pub fn bind(config: &ServerConfig, shutdown: CancellationToken) -> Result<Self> {
        let endpoint = make_server_endpoint(config.bind_addr)
            .with_context(|| format!("Failed to listen on {}", config.bind_addr))?;
        Ok(Self::with_endpoint(endpoint, config.upload_dir.clone(), shutdown))
    }

    /// Wrap an already bound server endpoint; received files go to `upload_dir`
    pub fn with_endpoint(
        endpoint: Endpoint,
        upload_dir: PathBuf,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Listening);
        Self {
            endpoint,
            upload_dir,
            shutdown,
            state,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Watch the supervisor state
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SupervisorState) {
        info!("Server {}", state);
        self.state.send_replace(state);
    }

    /// Run the accept loop until shutdown, then drain in-flight transfers.
    ///
    /// Handler failures are logged and never end the loop.
    pub async fn run(self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", self.upload_dir))?;

        info!("Listening on: {}", self.local_addr()?);
        self.set_state(SupervisorState::Running);

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {}", e);
                    }
                }
                incoming = self.endpoint.accept() => {
                    let Some(incoming) = incoming else {
                        warn!("Endpoint closed, stopping accept loop");
                        break;
                    };
                    let upload_dir = self.upload_dir.clone();
                    tasks.spawn(handle_connection(incoming, upload_dir));
                }
            }
        }

        // Refuse new handshakes; established connections are unaffected
        self.endpoint.set_server_config(None);
        self.set_state(SupervisorState::ShuttingDown);

        if !tasks.is_empty() {
            info!("Waiting for {} in-flight connection(s)", tasks.len());
        }
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!("Connection task failed: {}", e);
            }
        }

        self.endpoint.close(CLOSE_SHUTDOWN, b"server shutting down");
        self.endpoint.wait_idle().await;
        self.set_state(SupervisorState::Closed);
        Ok(())
    }
}

/// Handles an individual incoming connection: one stream, one file
async fn handle_connection(incoming: Incoming, upload_dir: PathBuf) {
    let remote_addr = incoming.remote_address();
    let connection = match incoming.await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Accept connection error from {}: {}", remote_addr, e);
            return;
        }
    };
    info!("Connection established with: {}", remote_addr);

    let result: std::result::Result<ReceivedFile, TransferError> = async {
        let (_send, mut recv) = connection
            .accept_bi()
            .await
            .map_err(TransferError::StreamOpen)?;
        handle_stream(&mut recv, &upload_dir).await
    }
    .await;

    match result {
        Ok(received) => {
            info!(
                "Stored {:?} from {} as {:?} ({} bytes)",
                received.original_name, remote_addr, received.path, received.bytes
            );
            connection.close(CLOSE_OK, b"");
        }
        Err(e) if e.is_framing() => {
            warn!("Rejected malformed header from {}: {}", remote_addr, e);
            connection.close(CLOSE_FAILED, e.to_string().as_bytes());
        }
        Err(e) => {
            error!("Handle stream error from {}: {}", remote_addr, e);
            connection.close(CLOSE_FAILED, e.to_string().as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SupervisorState::ShuttingDown.to_string(), "shutting down");
    }

    #[tokio::test]
    async fn test_cancel_before_any_connection_closes() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            upload_dir: dir.path().join("uploads"),
        };
        let shutdown = CancellationToken::new();
        let server = TransferServer::bind(&config, shutdown.clone()).unwrap();
        let mut state = server.subscribe();
        assert_eq!(*state.borrow(), SupervisorState::Listening);

        let handle = tokio::spawn(server.run());
        state
            .wait_for(|s| *s == SupervisorState::Running)
            .await
            .unwrap();
        assert!(config.upload_dir.is_dir());

        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
        assert_eq!(*state.borrow(), SupervisorState::Closed);
    }
}
