//! Client for the trqauthd-style authentication daemon.
//!
//! Each call dials the daemon's Unix socket, sends one pipe-delimited
//! request, reads one response and closes the socket.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::unistd::{Uid, User};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use crate::wire::FormatError;
use crate::wire::pipe::{self, Decoder, Encoder};

pub const DEFAULT_AUTH_SOCKET: &str = "/tmp/trqauthd-unix";

const OP_AUTH_CONNECTION: i64 = 1;
const OP_GET_ACTIVE_SERVER: i64 = 2;

/// The only authentication scheme the daemon offers to clients.
const AUTH_TYPE_IFF: i64 = 1;

/// Responses never exceed this size.
const RESPONSE_LIMIT: usize = 1024;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("cannot reach auth daemon at {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("auth daemon I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("auth daemon returned code {code}")]
    Rejected { code: i64 },
    #[error("malformed auth daemon response: {0}")]
    Format(#[from] FormatError),
    #[error("auth daemon returned invalid port {0}")]
    InvalidPort(i64),
    #[error("auth daemon did not answer within {0:?}")]
    Timeout(Duration),
    #[error("cannot determine current user: {0}")]
    UnknownUser(String),
}

/// Address of the active batch server as reported by the auth daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Identity presented to the auth daemon and the batch server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub pid: u32,
}

impl Credentials {
    /// Login name of the real user and this process id.
    pub fn current() -> Result<Self, AuthError> {
        let uid = Uid::current();
        let user = User::from_uid(uid)
            .map_err(|e| AuthError::UnknownUser(e.to_string()))?
            .ok_or_else(|| AuthError::UnknownUser(format!("no passwd entry for uid {uid}")))?;

        Ok(Self {
            username: user.name,
            pid: std::process::id(),
        })
    }
}

/// Client bound to one auth daemon socket.
#[derive(Debug, Clone)]
pub struct AuthClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl AuthClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Ask the daemon which batch server is currently active.
    pub async fn active_server(&self) -> Result<ServerAddress, AuthError> {
        let mut request = Encoder::new();
        request.put_int(OP_GET_ACTIVE_SERVER);

        // Response: "code|host|port|"
        let response = self.exchange(request.as_str(), 3).await?;
        let mut dec = Decoder::new(&response);

        check_code(dec.get_int()?)?;
        let host = dec.get_str()?.to_string();
        let port = dec.get_int()?;
        let port = u16::try_from(port).map_err(|_| AuthError::InvalidPort(port))?;

        let server = ServerAddress { host, port };
        debug!(server = %server, "Resolved active batch server");
        Ok(server)
    }

    /// Authorize the TCP connection `local_port -> server` for `credentials`.
    ///
    /// Must happen after the connection is open and before any request is
    /// written to it.
    pub async fn authorize(
        &self,
        local_port: u16,
        server: SocketAddr,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let request = authorize_request(local_port, server, credentials);

        // Response: "code|"
        let response = self.exchange(&request, 1).await?;
        let mut dec = Decoder::new(&response);
        check_code(dec.get_int()?)?;

        debug!(
            local_port,
            server = %server,
            user = %credentials.username,
            "Connection authorized"
        );
        Ok(())
    }

    async fn exchange(&self, request: &str, fields: usize) -> Result<String, AuthError> {
        tokio::time::timeout(self.timeout, self.round_trip(request, fields))
            .await
            .map_err(|_| AuthError::Timeout(self.timeout))?
    }

    async fn round_trip(&self, request: &str, fields: usize) -> Result<String, AuthError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| AuthError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let mut response = Vec::with_capacity(64);
        let mut chunk = [0u8; RESPONSE_LIMIT];
        while pipe::field_count(&response) < fields && response.len() < RESPONSE_LIMIT {
            let n = stream.read(&mut chunk[..RESPONSE_LIMIT - response.len()]).await?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&chunk[..n]);
        }

        String::from_utf8(response)
            .map_err(|e| AuthError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

fn check_code(code: i64) -> Result<(), AuthError> {
    if code != 0 {
        return Err(AuthError::Rejected { code });
    }
    Ok(())
}

/// Serialize an AUTH_CONNECTION request.
pub fn authorize_request(local_port: u16, server: SocketAddr, credentials: &Credentials) -> String {
    let mut enc = Encoder::new();
    enc.put_int(OP_AUTH_CONNECTION)
        .put_str(&server.ip().to_string())
        .put_int(i64::from(server.port()))
        .put_int(AUTH_TYPE_IFF)
        .put_str(&credentials.username)
        .put_int(i64::from(credentials.pid))
        .put_int(i64::from(local_port));
    enc.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    /// Serve one connection: capture the request, answer with `response`.
    async fn mock_daemon(
        response: &'static str,
    ) -> (tempfile::TempDir, PathBuf, tokio::task::JoinHandle<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trqauthd-unix");
        let listener = UnixListener::bind(&path).unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let n = stream.read(&mut buf).await.unwrap();
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        (dir, path, handle)
    }

    fn client(path: &Path) -> AuthClient {
        AuthClient::new(path, Duration::from_secs(2))
    }

    fn alice() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            pid: 4242,
        }
    }

    #[test]
    fn test_authorize_request_field_order() {
        let server: SocketAddr = "10.0.0.5:15001".parse().unwrap();
        assert_eq!(
            authorize_request(40000, server, &alice()),
            "1|10.0.0.5|15001|1|alice|4242|40000|"
        );
    }

    #[test]
    fn test_current_credentials_use_real_uid() {
        let expected = User::from_uid(Uid::current()).unwrap().unwrap();
        let creds = Credentials::current().unwrap();
        assert_eq!(creds.username, expected.name);
        assert_eq!(creds.pid, std::process::id());
    }

    #[tokio::test]
    async fn test_active_server() {
        let (_dir, path, handle) = mock_daemon("0|10.0.0.5|15001|").await;

        let server = client(&path).active_server().await.unwrap();
        assert_eq!(
            server,
            ServerAddress {
                host: "10.0.0.5".to_string(),
                port: 15001
            }
        );
        assert_eq!(handle.await.unwrap(), "2|");
    }

    #[tokio::test]
    async fn test_active_server_bad_port() {
        let (_dir, path, _handle) = mock_daemon("0|10.0.0.5|notaport|").await;

        let err = client(&path).active_server().await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Format(FormatError::InvalidInt { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_active_server_port_out_of_range() {
        let (_dir, path, _handle) = mock_daemon("0|10.0.0.5|70000|").await;

        let err = client(&path).active_server().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPort(70000)));
    }

    #[tokio::test]
    async fn test_active_server_rejected() {
        let (_dir, path, _handle) = mock_daemon("15007|").await;

        let err = client(&path).active_server().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { code: 15007 }));
    }

    #[tokio::test]
    async fn test_authorize_sends_tuple() {
        let (_dir, path, handle) = mock_daemon("0|").await;
        let server: SocketAddr = "127.0.0.1:15001".parse().unwrap();

        client(&path).authorize(40000, server, &alice()).await.unwrap();
        assert_eq!(handle.await.unwrap(), "1|127.0.0.1|15001|1|alice|4242|40000|");
    }

    #[tokio::test]
    async fn test_authorize_rejected() {
        let (_dir, path, _handle) = mock_daemon("-1|").await;
        let server: SocketAddr = "127.0.0.1:15001".parse().unwrap();

        let err = client(&path)
            .authorize(40000, server, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected { code: -1 }));
    }

    #[tokio::test]
    async fn test_truncated_response() {
        let (_dir, path, _handle) = mock_daemon("0|10.0.0.5").await;

        let err = client(&path).active_server().await.unwrap_err();
        assert!(matches!(err, AuthError::Format(FormatError::MissingField(1))));
    }

    #[tokio::test]
    async fn test_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let err = client(&dir.path().join("absent"))
            .active_server()
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_silent_daemon_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trqauthd-unix");
        let listener = UnixListener::bind(&path).unwrap();
        let _hold = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let client = AuthClient::new(&path, Duration::from_millis(100));
        let err = client.active_server().await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout(_)));
    }
}
