use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::auth::{ServiceAccountKey, ServiceAccountTokenProvider, StaticTokenProvider};
use crate::constants::DEFAULT_DATABASE_ID;
use crate::error::{internal_error, ProtoStoreResult};
use crate::model::DatabaseId;
use crate::remote::{Connection, DatastoreArc, HttpDatastore, InMemoryDatastore, TokenProviderArc};

/// An authenticated connection to one database.
///
/// Build it once and pass it to every [`ProtoClient`](crate::ProtoClient) that needs it.
/// Clones share the same connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    database_id: DatabaseId,
    datastore: DatastoreArc,
}

impl Session {
    pub fn builder(project_id: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(project_id)
    }

    /// Connects with the service-account key stored at `path`.
    ///
    /// # Errors
    /// `proto-store/credential` when the key file cannot be read or is not a usable
    /// service-account key.
    pub fn from_service_account_file(path: impl AsRef<Path>) -> ProtoStoreResult<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::from_service_account_key(key)
    }

    pub fn from_service_account_key(key: ServiceAccountKey) -> ProtoStoreResult<Self> {
        let client = build_client()?;
        let project_id = key.project_id.clone();
        let provider = ServiceAccountTokenProvider::new(key, client.clone()).into_arc();
        Self::builder(project_id)
            .with_client(client)
            .with_token_provider(provider)
            .build()
    }

    /// Connects with an already issued bearer token. No file access happens.
    pub fn from_access_token(project_id: impl Into<String>, token: impl Into<String>) -> ProtoStoreResult<Self> {
        Self::builder(project_id)
            .with_token_provider(StaticTokenProvider::new(token).into_arc())
            .build()
    }

    /// A session backed by a process-local store, for tests and demos.
    pub fn in_memory(project_id: impl Into<String>) -> Self {
        let database_id = DatabaseId::default(project_id);
        Self::from_parts(database_id, Arc::new(InMemoryDatastore::new()))
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    /// The underlying connection handle.
    pub fn datastore(&self) -> &DatastoreArc {
        &self.inner.datastore
    }

    fn from_parts(database_id: DatabaseId, datastore: DatastoreArc) -> Self {
        Self {
            inner: Arc::new(SessionInner { database_id, datastore }),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("database_id", &self.inner.database_id)
            .finish_non_exhaustive()
    }
}

pub struct SessionBuilder {
    project_id: String,
    database: String,
    emulator_host: Option<String>,
    request_timeout: Option<Duration>,
    client: Option<Client>,
    token_provider: Option<TokenProviderArc>,
    datastore: Option<DatastoreArc>,
}

impl SessionBuilder {
    fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: DEFAULT_DATABASE_ID.to_string(),
            emulator_host: None,
            request_timeout: None,
            client: None,
            token_provider: None,
            datastore: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Overrides the `FIRESTORE_EMULATOR_HOST` environment variable.
    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_token_provider(mut self, provider: TokenProviderArc) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Uses `datastore` instead of building an HTTP connection.
    pub fn with_datastore(mut self, datastore: DatastoreArc) -> Self {
        self.datastore = Some(datastore);
        self
    }

    pub fn build(self) -> ProtoStoreResult<Session> {
        let database_id = DatabaseId::new(self.project_id, self.database);
        if let Some(datastore) = self.datastore {
            return Ok(Session::from_parts(database_id, datastore));
        }

        let mut connection_builder = Connection::builder(database_id.clone());
        if let Some(client) = self.client {
            connection_builder = connection_builder.with_client(client);
        }
        if let Some(host) = self.emulator_host {
            connection_builder = connection_builder.with_emulator_host(host);
        }

        let mut datastore_builder =
            HttpDatastore::builder(database_id.clone()).with_connection_builder(connection_builder);
        if let Some(provider) = self.token_provider {
            datastore_builder = datastore_builder.with_auth_provider(provider);
        }
        if let Some(timeout) = self.request_timeout {
            datastore_builder = datastore_builder.with_request_timeout(timeout);
        }
        let datastore = datastore_builder.build()?;
        log::info!("Opened session for {} at {}", database_id.database_name(), datastore.base_url());
        Ok(Session::from_parts(database_id, Arc::new(datastore)))
    }
}

fn build_client() -> ProtoStoreResult<Client> {
    Client::builder()
        .build()
        .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtoStoreErrorCode;

    #[test]
    fn missing_credential_file_fails_construction() {
        let err = Session::from_service_account_file("/nonexistent/key.json").unwrap_err();
        assert_eq!(err.code, ProtoStoreErrorCode::Credential);
    }

    #[test]
    fn service_account_session_uses_key_project() {
        let session = Session::from_service_account_file(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/service_account.json"
        ))
        .unwrap();
        assert_eq!(session.database_id(), &DatabaseId::default("demo-project"));
    }

    #[test]
    fn builder_selects_named_database() {
        let session = Session::builder("demo")
            .with_database("queues")
            .with_emulator_host("localhost:8080")
            .build()
            .unwrap();
        assert_eq!(session.database_id().database(), "queues");
    }

    #[test]
    fn clones_share_the_connection() {
        let session = Session::in_memory("demo");
        let clone = session.clone();
        assert!(Arc::ptr_eq(session.datastore(), clone.datastore()));
    }
}
