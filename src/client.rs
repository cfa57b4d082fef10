//! End-to-end status query.
//!
//! One query resolves the active server, dials it, authorizes the fresh
//! connection and decodes the job list. Nothing is reused between queries.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::auth::{AuthClient, Credentials, ServerAddress};
use crate::batch::BatchConnection;
use crate::config::AppConfig;
use crate::core::Job;
use crate::error::Result;

/// Result of one successful query.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub server: ServerAddress,
    pub jobs: Vec<Job>,
}

/// Something that can produce a fresh job list on demand.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch(&self) -> Result<StatusReport>;
}

pub struct StatusClient {
    auth: AuthClient,
    credentials: Credentials,
    timeout: Duration,
}

impl StatusClient {
    pub fn new(auth: AuthClient, credentials: Credentials, timeout: Duration) -> Self {
        Self {
            auth,
            credentials,
            timeout,
        }
    }

    /// Client for the current user against the configured auth daemon.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let credentials = Credentials::current()?;
        let auth = AuthClient::new(&config.auth_socket, config.timeout());
        Ok(Self::new(auth, credentials, config.timeout()))
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub async fn active_server(&self) -> Result<ServerAddress> {
        Ok(self.auth.active_server().await?)
    }

    pub async fn query(&self) -> Result<StatusReport> {
        let server = self.active_server().await?;

        let conn = BatchConnection::connect(&server, self.timeout).await?;
        let conn = conn.authorize(&self.auth, &self.credentials).await?;
        debug!(server = %server, local = %conn.local_addr(), "Sending status request");

        let jobs = conn.status_jobs(&self.credentials.username).await?;
        info!(server = %server, jobs = jobs.len(), "Status query complete");

        Ok(StatusReport { server, jobs })
    }
}

#[async_trait]
impl JobSource for StatusClient {
    async fn fetch(&self) -> Result<StatusReport> {
        self.query().await
    }
}
