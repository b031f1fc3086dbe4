// ABOUTME: Scripted SSH transport that records every call.
// ABOUTME: Lets tests assert auth order, host-key checks and session closing without a server.

use async_trait::async_trait;
use parking_lot::Mutex;
use quall::ssh::{
    CommandOutput, Connector, Error, ExecOptions, HostKeyStore, PrivateKey, PublicKey, Result,
    SessionConfig, Transport,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How the fake server behaves.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub server_key: Option<PublicKey>,
    pub agent_accepts: bool,
    pub key_accepts: bool,
    /// Password the server accepts.
    pub password: Option<String>,
    /// Exec sleeps this long before answering.
    pub exec_delay: Option<Duration>,
    pub exit_code: u32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Remote filesystem.
    pub files: HashMap<String, Vec<u8>>,
}

/// Calls made against every transport opened by one connector.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    pub fn auth_attempts(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|e| e.strip_prefix("auth:").map(str::to_string))
            .collect()
    }
}

#[derive(Clone)]
pub struct FakeConnector {
    script: Script,
    log: CallLog,
    /// Shared so tests can inspect uploads after the transport is gone.
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl FakeConnector {
    pub fn new(script: Script) -> Self {
        let files = Arc::new(Mutex::new(script.files.clone()));
        Self {
            script,
            log: CallLog::default(),
            files,
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn remote_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, config: &SessionConfig) -> Result<FakeTransport> {
        self.log.push(format!("connect:{}", config.target()));
        Ok(FakeTransport {
            script: self.script.clone(),
            log: self.log.clone(),
            files: Arc::clone(&self.files),
        })
    }
}

#[derive(Debug)]
pub struct FakeTransport {
    script: Script,
    log: CallLog,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl Transport for FakeTransport {
    fn server_key(&self) -> Option<PublicKey> {
        self.script.server_key.clone()
    }

    async fn auth_agent(&mut self, _user: &str) -> Result<bool> {
        self.log.push("auth:agent");
        Ok(self.script.agent_accepts)
    }

    async fn auth_publickey(&mut self, _user: &str, _key: Arc<PrivateKey>) -> Result<bool> {
        self.log.push("auth:key");
        Ok(self.script.key_accepts)
    }

    async fn auth_password(&mut self, _user: &str, password: &str) -> Result<bool> {
        self.log.push("auth:password");
        Ok(self.script.password.as_deref() == Some(password))
    }

    async fn exec(&mut self, command: &str, _options: &ExecOptions) -> Result<CommandOutput> {
        self.log.push(format!("exec:{command}"));
        if let Some(delay) = self.script.exec_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(CommandOutput {
            exit_code: self.script.exit_code,
            stdout: self.script.stdout.clone(),
            stderr: self.script.stderr.clone(),
        })
    }

    async fn read_remote_file(&mut self, path: &str) -> Result<Vec<u8>> {
        self.log.push(format!("read:{path}"));
        self.files.lock().get(path).cloned().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file",
            ))
        })
    }

    async fn write_remote_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        self.log.push(format!("write:{path}"));
        self.files.lock().insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.push("close");
        Ok(())
    }
}

/// Host key store that counts lookups.
#[derive(Clone, Default)]
pub struct CountingStore {
    keys: Vec<PublicKey>,
    lookups: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn with_key(key: PublicKey) -> Self {
        Self {
            keys: vec![key],
            lookups: Arc::default(),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl HostKeyStore for CountingStore {
    fn lookup(&self, _host: &str, _port: u16) -> Result<Vec<PublicKey>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.keys.clone())
    }
}
