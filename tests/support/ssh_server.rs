// ABOUTME: In-process russh server for transport integration tests.
// ABOUTME: Runs commands through sh and serves SFTP from an in-memory file map.

use parking_lot::Mutex;
use russh::keys::ssh_key::PublicKey;
use russh::keys::{load_public_key, load_secret_key};
use russh::server::{Auth, Config, Handler, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use russh_sftp::protocol::{Data, FileAttributes, Handle, OpenFlags, Status, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_USER: &str = "tester";
pub const TEST_PASSWORD: &str = "letmein";

/// Terminal requested by a client before running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
}

#[derive(Default)]
struct State {
    files: HashMap<String, Vec<u8>>,
    ptys: Vec<PtyRequest>,
    shells: usize,
    commands: Vec<String>,
}

/// Listens on a free loopback port until dropped.
///
/// The host key is the `test_key` fixture, so clients can trust it with
/// `test_key.pub`. Password auth accepts [`TEST_USER`]/[`TEST_PASSWORD`];
/// key auth accepts `test_key.pub` and `rsa_key.pub`.
pub struct SshServer {
    port: u16,
    state: Arc<Mutex<State>>,
    accept: JoinHandle<()>,
}

impl SshServer {
    pub async fn start() -> std::io::Result<Self> {
        let host_key =
            load_secret_key(super::fixture("test_key"), None).map_err(std::io::Error::other)?;
        let authorized = ["test_key.pub", "rsa_key.pub"]
            .into_iter()
            .map(|name| load_public_key(super::fixture(name)).map_err(std::io::Error::other))
            .collect::<std::io::Result<Vec<_>>>()?;

        let config = Arc::new(Config {
            keys: vec![host_key],
            auth_rejection_time: Duration::from_millis(10),
            auth_rejection_time_initial: Some(Duration::ZERO),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let authorized = Arc::new(authorized);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let state = Arc::new(Mutex::new(State::default()));

        let shared = Arc::clone(&state);
        let accept = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = Connection {
                    state: Arc::clone(&shared),
                    authorized: Arc::clone(&authorized),
                    channels: HashMap::new(),
                    shell_input: HashMap::new(),
                };
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    match russh::server::run_stream(config, socket, handler).await {
                        Ok(session) => {
                            if let Err(e) = session.await {
                                tracing::debug!("Test SSH session ended with error: {}", e);
                            }
                        }
                        Err(e) => tracing::debug!("Test SSH handshake failed: {}", e),
                    }
                });
            }
        });

        Ok(Self {
            port,
            state,
            accept,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Place a file the SFTP subsystem can serve.
    pub fn put_file(&self, path: &str, contents: &[u8]) {
        self.state
            .lock()
            .files
            .insert(path.to_string(), contents.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn pty_requests(&self) -> Vec<PtyRequest> {
        self.state.lock().ptys.clone()
    }

    pub fn shell_requests(&self) -> usize {
        self.state.lock().shells
    }

    /// Command lines received through exec requests.
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    pub fn host_key(&self) -> PublicKey {
        let text = std::fs::read_to_string(super::fixture("test_key.pub")).unwrap();
        PublicKey::from_openssh(text.trim()).unwrap()
    }
}

impl Drop for SshServer {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

struct Connection {
    state: Arc<Mutex<State>>,
    authorized: Arc<Vec<PublicKey>>,
    channels: HashMap<ChannelId, Channel<Msg>>,
    shell_input: HashMap<ChannelId, Vec<u8>>,
}

/// Run `script` with sh, then send its output and exit status and close.
async fn run_script(
    channel: ChannelId,
    script: &str,
    session: &mut Session,
) -> Result<(), russh::Error> {
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(script)
        .output()
        .await?;

    if !output.stdout.is_empty() {
        session.data(channel, CryptoVec::from(output.stdout))?;
    }
    if !output.stderr.is_empty() {
        session.extended_data(channel, 1, CryptoVec::from(output.stderr))?;
    }
    let code = output.status.code().unwrap_or(255);
    session.exit_status_request(channel, code as u32)?;
    session.eof(channel)?;
    session.close(channel)
}

impl Handler for Connection {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if user == TEST_USER && password == TEST_PASSWORD {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        let known = self
            .authorized
            .iter()
            .any(|key| key.key_data() == public_key.key_data());
        if user == TEST_USER && known {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.channels.insert(channel.id(), channel);
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.state.lock().ptys.push(PtyRequest {
            term: term.to_string(),
            cols: col_width,
            rows: row_height,
        });
        session.channel_success(channel)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.channels.remove(&channel);
        session.channel_success(channel)?;
        let command = String::from_utf8_lossy(data).into_owned();
        self.state.lock().commands.push(command.clone());
        run_script(channel, &command, session).await
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.channels.remove(&channel);
        self.state.lock().shells += 1;
        self.shell_input.insert(channel, Vec::new());
        session.channel_success(channel)
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(input) = self.shell_input.get_mut(&channel) {
            input.extend_from_slice(data);
        }
        Ok(())
    }

    // A shell reads its script until the client sends EOF.
    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        match self.shell_input.remove(&channel) {
            Some(input) => {
                let script = String::from_utf8_lossy(&input).into_owned();
                run_script(channel, &script, session).await
            }
            None => Ok(()),
        }
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        match self.channels.remove(&channel) {
            Some(stream) if name == "sftp" => {
                session.channel_success(channel)?;
                let files = SftpFiles {
                    state: Arc::clone(&self.state),
                    handles: HashMap::new(),
                    next_handle: 0,
                };
                russh_sftp::server::run(stream.into_stream(), files).await;
                Ok(())
            }
            _ => session.channel_failure(channel),
        }
    }
}

/// SFTP handler over the server's in-memory files.
struct SftpFiles {
    state: Arc<Mutex<State>>,
    handles: HashMap<String, String>,
    next_handle: u64,
}

impl SftpFiles {
    fn path(&self, handle: &str) -> Result<String, StatusCode> {
        self.handles.get(handle).cloned().ok_or(StatusCode::Failure)
    }
}

fn ok_status(id: u32) -> Status {
    Status {
        id,
        status_code: StatusCode::Ok,
        error_message: "Ok".to_string(),
        language_tag: "en-US".to_string(),
    }
}

impl russh_sftp::server::Handler for SftpFiles {
    type Error = StatusCode;

    fn unimplemented(&self) -> Self::Error {
        StatusCode::OpUnsupported
    }

    async fn open(
        &mut self,
        id: u32,
        filename: String,
        pflags: OpenFlags,
        _attrs: FileAttributes,
    ) -> Result<Handle, Self::Error> {
        {
            let mut state = self.state.lock();
            if pflags.contains(OpenFlags::CREATE) {
                let file = state.files.entry(filename.clone()).or_default();
                if pflags.contains(OpenFlags::TRUNCATE) {
                    file.clear();
                }
            } else if !state.files.contains_key(&filename) {
                return Err(StatusCode::NoSuchFile);
            }
        }

        self.next_handle += 1;
        let handle = self.next_handle.to_string();
        self.handles.insert(handle.clone(), filename);
        Ok(Handle { id, handle })
    }

    async fn close(&mut self, id: u32, handle: String) -> Result<Status, Self::Error> {
        self.handles.remove(&handle);
        Ok(ok_status(id))
    }

    async fn read(
        &mut self,
        id: u32,
        handle: String,
        offset: u64,
        len: u32,
    ) -> Result<Data, Self::Error> {
        let path = self.path(&handle)?;
        let state = self.state.lock();
        let contents = state.files.get(&path).ok_or(StatusCode::NoSuchFile)?;

        let start = usize::try_from(offset).map_err(|_| StatusCode::Failure)?;
        if start >= contents.len() {
            return Err(StatusCode::Eof);
        }
        let end = contents.len().min(start + len as usize);
        Ok(Data {
            id,
            data: contents[start..end].to_vec(),
        })
    }

    async fn write(
        &mut self,
        id: u32,
        handle: String,
        offset: u64,
        data: Vec<u8>,
    ) -> Result<Status, Self::Error> {
        let path = self.path(&handle)?;
        let mut state = self.state.lock();
        let file = state.files.get_mut(&path).ok_or(StatusCode::NoSuchFile)?;

        let start = usize::try_from(offset).map_err(|_| StatusCode::Failure)?;
        let end = start + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[start..end].copy_from_slice(&data);
        Ok(ok_status(id))
    }
}
