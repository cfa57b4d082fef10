//! TCP connection to the batch server.
//!
//! A freshly dialed connection is `Unauthorized` and cannot carry requests.
//! The only way to obtain an `Authorized` connection is through
//! [`BatchConnection::authorize`], which registers this exact socket with the
//! auth daemon before anything is written to it.

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use super::status;
use crate::auth::{AuthClient, Credentials, ServerAddress};
use crate::core::Job;
use crate::error::{Error, Result};

/// Dialed but not yet registered with the auth daemon.
#[derive(Debug)]
pub struct Unauthorized;

/// Registered with the auth daemon; requests may be sent.
#[derive(Debug)]
pub struct Authorized;

#[derive(Debug)]
pub struct BatchConnection<S> {
    stream: TcpStream,
    local: SocketAddr,
    peer: SocketAddr,
    timeout: Duration,
    _state: PhantomData<S>,
}

impl<S> BatchConnection<S> {
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl BatchConnection<Unauthorized> {
    /// Dial the batch server. `timeout` bounds the dial here and each
    /// request issued on the connection later.
    pub async fn connect(server: &ServerAddress, timeout: Duration) -> Result<Self> {
        let target = server.to_string();
        let stream = tokio::time::timeout(
            timeout,
            TcpStream::connect((server.host.as_str(), server.port)),
        )
        .await
        .map_err(|_| Error::Timeout {
            stage: "connect",
            after: timeout,
        })?
        .map_err(|source| Error::Connect {
            target: target.clone(),
            source,
        })?;

        let local = stream.local_addr().map_err(|source| Error::Connect {
            target: target.clone(),
            source,
        })?;
        let peer = stream
            .peer_addr()
            .map_err(|source| Error::Connect { target, source })?;

        debug!(local = %local, peer = %peer, "Connected to batch server");
        Ok(Self {
            stream,
            local,
            peer,
            timeout,
            _state: PhantomData,
        })
    }

    /// Register this connection's (local port, peer) tuple with the auth daemon.
    pub async fn authorize(
        self,
        auth: &AuthClient,
        credentials: &Credentials,
    ) -> Result<BatchConnection<Authorized>> {
        auth.authorize(self.local.port(), self.peer, credentials).await?;

        Ok(BatchConnection {
            stream: self.stream,
            local: self.local,
            peer: self.peer,
            timeout: self.timeout,
            _state: PhantomData,
        })
    }
}

impl BatchConnection<Authorized> {
    /// Send STATUS_JOB and decode the reply. Consumes the connection; it is
    /// closed when this returns, on success or failure.
    pub async fn status_jobs(mut self, username: &str) -> Result<Vec<Job>> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.exchange(username))
            .await
            .map_err(|_| Error::Timeout {
                stage: "status query",
                after: timeout,
            })?
    }

    async fn exchange(&mut self, username: &str) -> Result<Vec<Job>> {
        let request = status::encode_request(username);
        self.stream.write_all(&request).await?;
        self.stream.flush().await?;

        let mut reader = BufReader::new(&mut self.stream);
        status::read_reply(&mut reader).await
    }
}
