use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;

use crate::constants::{EMULATOR_HOST_ENV, FIRESTORE_API_HOST, FIRESTORE_API_VERSION};
use crate::error::{internal_error, operation_error, unavailable, ProtoStoreError, ProtoStoreResult, RpcStatus};
use crate::model::{DatabaseId, ResourcePath};

use super::rpc_error::map_http_error;

// Characters left as-is inside a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    client: Option<Client>,
    emulator_host: Option<String>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            client: None,
            emulator_host: std::env::var(EMULATOR_HOST_ENV).ok().filter(|host| !host.is_empty()),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn build(self) -> ProtoStoreResult<Connection> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        let base_url = build_base_url(&self.database_id, self.emulator_host.as_deref());
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn invoke_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> ProtoStoreResult<JsonValue> {
        let (status, text) = self.send(method, path, body, context).await?;
        if status.is_success() {
            parse_body(&text)
        } else {
            Err(map_http_error(status, &text))
        }
    }

    /// Like [`Connection::invoke_json`] but maps `404 Not Found` to `Ok(None)`.
    pub async fn invoke_json_optional(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> ProtoStoreResult<Option<JsonValue>> {
        let (status, text) = self.send(method, path, body, context).await?;
        if status.is_success() {
            parse_body(&text).map(Some)
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(map_http_error(status, &text))
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        context: &RequestContext,
    ) -> ProtoStoreResult<(StatusCode, String)> {
        let mut request = self.build_request(method.clone(), path, context);
        if let Some(body) = body {
            request = request.json(body);
        }
        log::debug!("{method} {path}");
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;
        log::debug!("{method} {path} -> {status}");
        Ok((status, text))
    }

    fn build_request(&self, method: Method, path: &str, context: &RequestContext) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self.client.request(method, url);
        if let Some(timeout) = context.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = context.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder.header("Content-Type", "application/json")
    }
}

/// Renders `path` for use in a request URL, escaping each segment on its own.
pub fn encode_resource_path(path: &ResourcePath) -> String {
    path.iter()
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn parse_body(text: &str) -> ProtoStoreResult<JsonValue> {
    if text.is_empty() {
        Ok(JsonValue::Null)
    } else {
        serde_json::from_str(text).map_err(|err| internal_error(format!("Malformed response body: {err}")))
    }
}

fn map_transport_error(err: reqwest::Error) -> ProtoStoreError {
    if err.is_timeout() {
        operation_error(RpcStatus::DeadlineExceeded, err.to_string())
    } else if err.is_connect() {
        unavailable(err.to_string())
    } else {
        internal_error(err.to_string())
    }
}

fn build_base_url(database_id: &DatabaseId, emulator_host: Option<&str>) -> String {
    match emulator_host {
        Some(host) => format!(
            "http://{host}/{api_version}/{}",
            database_id.database_name(),
            api_version = FIRESTORE_API_VERSION
        ),
        None => format!(
            "{host}/{api_version}/{}",
            database_id.database_name(),
            host = FIRESTORE_API_HOST,
            api_version = FIRESTORE_API_VERSION
        ),
    }
}
