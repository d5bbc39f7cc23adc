//! HTTP client for the OpenFGA API
//!
//! [`OpenFgaClient`] handles the unscoped store-level calls (create a store,
//! write the authorization model, delete the store). [`bootstrap`] turns it
//! into a [`ScopedOpenFgaClient`], which carries the store and model ids and
//! implements [`AuthorizationService`].
//!
//! The client uses reqwest's connection pooling and never retries.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, trace};

use super::{authorization_model, AuthorizationService, CheckResponse, OpenFgaError, WriteResponse};
use crate::config::OpenFgaConfig;
use crate::fixtures::Tuple;
use crate::logging::sanitize_log_message;

/// Store and model ids every write and check is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreScope {
    pub store_id: String,
    pub authorization_model_id: String,
}

#[derive(Serialize)]
struct CreateStoreBody<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct CreateStoreReply {
    id: String,
}

#[derive(Deserialize)]
struct WriteModelReply {
    authorization_model_id: String,
}

#[derive(Serialize)]
struct TupleKeys<'a> {
    tuple_keys: &'a [Tuple],
}

#[derive(Serialize)]
struct WriteBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    writes: Option<TupleKeys<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletes: Option<TupleKeys<'a>>,
    authorization_model_id: &'a str,
}

#[derive(Serialize)]
struct CheckBody<'a> {
    tuple_key: &'a Tuple,
    authorization_model_id: &'a str,
}

#[derive(Deserialize)]
struct CheckReply {
    #[serde(default)]
    allowed: bool,
}

#[derive(Deserialize)]
struct ErrorReply {
    code: String,
    message: String,
}

impl From<reqwest::Error> for OpenFgaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OpenFgaError::Timeout
        } else if err.is_decode() {
            OpenFgaError::Decode(sanitize_log_message(&err.to_string()))
        } else {
            OpenFgaError::Transport(sanitize_log_message(&err.to_string()))
        }
    }
}

/// Map a non-2xx response onto an error
fn status_error(status: StatusCode, body: &str) -> OpenFgaError {
    let body = sanitize_log_message(body);

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            match serde_json::from_str::<ErrorReply>(&body) {
                Ok(reply) => OpenFgaError::Validation {
                    code: reply.code,
                    message: reply.message,
                },
                Err(_) => OpenFgaError::Api {
                    status: status.as_u16(),
                    body,
                },
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OpenFgaError::Unauthenticated(body),
        _ => OpenFgaError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

/// Unscoped OpenFGA HTTP client
#[derive(Clone)]
pub struct OpenFgaClient {
    http: Client,
    api_url: String,
    api_token: Option<String>,
}

impl std::fmt::Debug for OpenFgaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFgaClient")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl OpenFgaClient {
    pub fn new(config: &OpenFgaConfig) -> Result<Self, OpenFgaError> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        if api_url.is_empty() {
            return Err(OpenFgaError::InvalidRequest("API URL cannot be empty".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| OpenFgaError::InvalidRequest(format!("Failed to build HTTP client: {e}")))?;

        let api_token = config.api_token.clone().filter(|token| !token.is_empty());

        debug!(api_url = %api_url, authenticated = api_token.is_some(), "OpenFGA client created");

        Ok(Self { http, api_url, api_token })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.api_url, path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the status and raw body of a 2xx response
    async fn send(&self, builder: RequestBuilder) -> Result<(u16, String), OpenFgaError> {
        let response = builder.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &raw));
        }

        Ok((status.as_u16(), raw))
    }

    async fn send_json<B, R>(&self, method: Method, path: &str, body: &B) -> Result<(u16, R, String), OpenFgaError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (status, raw) = self.send(self.request(method, path).json(body)).await?;
        let reply = serde_json::from_str(&raw)
            .map_err(|e| OpenFgaError::Decode(format!("{e}: {}", sanitize_log_message(&raw))))?;
        Ok((status, reply, raw))
    }

    /// Create a store and return its id
    pub async fn create_store(&self, name: &str) -> Result<String, OpenFgaError> {
        let (_, reply, _): (_, CreateStoreReply, _) = self
            .send_json(Method::POST, "/stores", &CreateStoreBody { name })
            .await?;

        info!(store_id = %reply.id, store_name = %name, "Created OpenFGA store");
        Ok(reply.id)
    }

    /// Write an authorization model into a store and return the model id
    pub async fn write_authorization_model(
        &self,
        store_id: &str,
        model: &Value,
    ) -> Result<String, OpenFgaError> {
        let path = format!("/stores/{store_id}/authorization-models");
        let (_, reply, _): (_, WriteModelReply, _) =
            self.send_json(Method::POST, &path, model).await?;

        info!(
            store_id = %store_id,
            authorization_model_id = %reply.authorization_model_id,
            "Wrote authorization model"
        );
        Ok(reply.authorization_model_id)
    }

    pub async fn delete_store(&self, store_id: &str) -> Result<(), OpenFgaError> {
        self.send(self.request(Method::DELETE, &format!("/stores/{store_id}")))
            .await?;
        info!(store_id = %store_id, "Deleted OpenFGA store");
        Ok(())
    }

    pub fn scoped(self, scope: StoreScope) -> ScopedOpenFgaClient {
        ScopedOpenFgaClient { client: self, scope }
    }
}

/// Create a store, write [`authorization_model`] into it and scope the client
/// to the result.
pub async fn bootstrap(
    client: OpenFgaClient,
    store_name: &str,
) -> Result<ScopedOpenFgaClient, OpenFgaError> {
    let store_id = client.create_store(store_name).await?;
    let authorization_model_id = client
        .write_authorization_model(&store_id, &authorization_model())
        .await?;

    Ok(client.scoped(StoreScope {
        store_id,
        authorization_model_id,
    }))
}

/// OpenFGA client bound to one store and authorization model
#[derive(Debug, Clone)]
pub struct ScopedOpenFgaClient {
    client: OpenFgaClient,
    scope: StoreScope,
}

impl ScopedOpenFgaClient {
    pub fn scope(&self) -> &StoreScope {
        &self.scope
    }

    pub fn client(&self) -> &OpenFgaClient {
        &self.client
    }

    /// Delete the store this client is scoped to
    pub async fn delete_store(&self) -> Result<(), OpenFgaError> {
        self.client.delete_store(&self.scope.store_id).await
    }
}

#[async_trait]
impl AuthorizationService for ScopedOpenFgaClient {
    async fn write(
        &self,
        writes: &[Tuple],
        deletes: &[Tuple],
    ) -> Result<WriteResponse, OpenFgaError> {
        if writes.is_empty() && deletes.is_empty() {
            return Err(OpenFgaError::InvalidRequest(
                "A write must contain at least one write or delete".to_string(),
            ));
        }

        let body = WriteBody {
            writes: (!writes.is_empty()).then_some(TupleKeys { tuple_keys: writes }),
            deletes: (!deletes.is_empty()).then_some(TupleKeys { tuple_keys: deletes }),
            authorization_model_id: &self.scope.authorization_model_id,
        };

        let path = format!("/stores/{}/write", self.scope.store_id);
        let (status, raw) = self
            .client
            .send(self.client.request(Method::POST, &path).json(&body))
            .await?;

        trace!(writes = writes.len(), deletes = deletes.len(), status, "Tuple write completed");

        Ok(WriteResponse { status, raw })
    }

    async fn check(&self, tuple: &Tuple) -> Result<CheckResponse, OpenFgaError> {
        let body = CheckBody {
            tuple_key: tuple,
            authorization_model_id: &self.scope.authorization_model_id,
        };

        let path = format!("/stores/{}/check", self.scope.store_id);
        let (status, reply, raw): (_, CheckReply, _) =
            self.client.send_json(Method::POST, &path, &body).await?;

        trace!(
            user = %tuple.user,
            relation = %tuple.relation,
            object = %tuple.object,
            allowed = reply.allowed,
            "Check completed"
        );

        Ok(CheckResponse {
            status,
            allowed: reply.allowed,
            raw,
        })
    }
}
