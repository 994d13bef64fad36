#![allow(dead_code)]

use qft_core::transfer::{SupervisorState, TransferServer};
use qft_core::{ClientConfig, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TestServer {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub shutdown: CancellationToken,
    pub state: watch::Receiver<SupervisorState>,
    pub handle: JoinHandle<anyhow::Result<()>>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            upload_dir: dir.path().join("uploads"),
        };
        let shutdown = CancellationToken::new();
        let server = TransferServer::bind(&config, shutdown.clone()).unwrap();
        let addr = server.local_addr().unwrap();
        let mut state = server.subscribe();
        let handle = tokio::spawn(server.run());
        state
            .wait_for(|s| *s == SupervisorState::Running)
            .await
            .unwrap();

        Self {
            addr,
            upload_dir: config.upload_dir,
            shutdown,
            state,
            handle,
            _dir: dir,
        }
    }

    pub fn addr_string(&self) -> String {
        self.addr.to_string()
    }

    /// Cancel and wait for the server to reach `Closed`
    pub async fn stop(self) -> (PathBuf, tempfile::TempDir) {
        self.shutdown.cancel();
        tokio::time::timeout(TEST_TIMEOUT, self.handle)
            .await
            .expect("server did not stop in time")
            .unwrap()
            .unwrap();
        assert_eq!(*self.state.borrow(), SupervisorState::Closed);
        (self.upload_dir, self._dir)
    }
}

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init()
        .ok();
}

pub fn client_config() -> ClientConfig {
    ClientConfig {
        connect_timeout_secs: 2,
        ..ClientConfig::default()
    }
}

/// Deterministic, non-repeating-looking test content
pub fn pattern(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

pub fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Every stored file whose name starts with `<name>-`
pub fn stored_files(upload_dir: &Path, name: &str) -> Vec<PathBuf> {
    let prefix = format!("{}-", name);
    let mut files: Vec<PathBuf> = match std::fs::read_dir(upload_dir) {
        Ok(rd) => rd
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

pub fn all_files(upload_dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(upload_dir) {
        Ok(rd) => rd.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
