//! REST client for the remote taxonomy store.
//!
//! Every endpoint answers with the envelope `{success, data, message?}`.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::RemoteConfig;
use crate::domain::{CreateRequest, LeafMember, ListKind, Node, NodeUpdate, Scope, TaxonomyKind};
use crate::infrastructure::error::{BackendError, InfraError, InfraResult};
use crate::infrastructure::traits::{BulkDeleteResponse, TaxonomyBackend};

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct BulkDeleteRequest<'a> {
    ids: &'a [String],
}

/// Blocking HTTP backend.
pub struct HttpBackend {
    http: Client,
    base_url: Url,
    page_limit: usize,
}

impl HttpBackend {
    pub fn new(config: &RemoteConfig) -> InfraResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| InfraError::InvalidUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidUrl {
                url: config.base_url.clone(),
                message: "not a hierarchical url".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InfraError::Http {
                context: "build http client".to_string(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url,
            page_limit: config.page_limit,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::transport("base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and unwrap the envelope. `data` may be absent.
    fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Option<T>, BackendError> {
        let response = request.send().map_err(|e| {
            warn!("{}: request failed: {}", what, e);
            BackendError::Transport { message: None }
        })?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            warn!("{}: could not read response body: {}", what, e);
            BackendError::Transport { message: None }
        })?;
        debug!("{}: status={} bytes={}", what, status, body.len());

        let envelope: Option<ApiEnvelope<Value>> = match serde_json::from_str(&body) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                debug!("{}: body is not an envelope: {}", what, e);
                None
            }
        };
        let message = envelope.as_ref().and_then(|e| e.message.clone());

        match status {
            StatusCode::NOT_FOUND => {
                return Err(BackendError::NotFound(message.unwrap_or_else(|| what.to_string())))
            }
            StatusCode::CONFLICT => {
                return Err(BackendError::Conflict(message.unwrap_or_else(|| what.to_string())))
            }
            s if !s.is_success() => {
                return Err(BackendError::Rejected {
                    status: s.as_u16(),
                    message,
                })
            }
            _ => {}
        }

        match envelope {
            Some(env) if env.success => env
                .data
                .filter(|data| !data.is_null())
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| BackendError::Rejected {
                    status: status.as_u16(),
                    message: Some(format!("{what}: unexpected data: {e}")),
                }),
            Some(env) => Err(BackendError::Rejected {
                status: status.as_u16(),
                message: env.message,
            }),
            None => Err(BackendError::Rejected {
                status: status.as_u16(),
                message: Some(format!("{what}: malformed response")),
            }),
        }
    }

    fn call_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        self.call(request, what)?.ok_or_else(|| BackendError::Rejected {
            status: StatusCode::OK.as_u16(),
            message: Some(format!("{what}: response carried no data")),
        })
    }

    fn scope_query(&self, scope: &Scope) -> Vec<(&'static str, String)> {
        vec![
            ("company", scope.name.clone()),
            ("limit", self.page_limit.to_string()),
        ]
    }
}

impl TaxonomyBackend for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    fn list_nodes(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
        list_kind: ListKind,
    ) -> Result<Vec<Node>, BackendError> {
        let mut query = self.scope_query(scope);
        if let Some(value) = list_kind.query_value() {
            query.push(("kind", value.to_string()));
        }
        let request = self.http.get(self.url(&[kind.resource()])?).query(&query);
        self.call_data(request, &format!("list {}", kind.resource()))
    }

    #[instrument(level = "debug", skip(self))]
    fn create_node(&self, kind: TaxonomyKind, request: &CreateRequest) -> Result<Node, BackendError> {
        let http_request = self.http.post(self.url(&[kind.resource()])?).json(request);
        self.call_data(http_request, &format!("create {}", request.display_name))
    }

    #[instrument(level = "debug", skip(self))]
    fn update_node(
        &self,
        kind: TaxonomyKind,
        id: &str,
        changes: &NodeUpdate,
    ) -> Result<Node, BackendError> {
        let request = self.http.put(self.url(&[kind.resource(), id])?).json(changes);
        self.call_data(request, id)
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_node(&self, kind: TaxonomyKind, id: &str) -> Result<(), BackendError> {
        let request = self.http.delete(self.url(&[kind.resource(), id])?);
        self.call::<Value>(request, id).map(|_| ())
    }

    #[instrument(level = "debug", skip(self))]
    fn bulk_delete(
        &self,
        kind: TaxonomyKind,
        ids: &[String],
    ) -> Result<BulkDeleteResponse, BackendError> {
        let request = self
            .http
            .post(self.url(&[kind.resource(), "bulk-delete"])?)
            .json(&BulkDeleteRequest { ids });
        self.call_data(request, &format!("bulk delete {}", kind.resource()))
    }

    #[instrument(level = "debug", skip(self))]
    fn list_leaf_members(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
    ) -> Result<Vec<LeafMember>, BackendError> {
        let Some(source) = kind.member_source() else {
            return Ok(Vec::new());
        };

        let fields = serde_json::to_string(&[source.group_field])
            .map_err(|e| BackendError::transport(format!("encode fields: {e}")))?;
        let mut query = self.scope_query(scope);
        query.push(("fields", fields));

        let request = self.http.get(self.url(&[source.resource])?).query(&query);
        let records: Vec<Value> = self.call_data(request, &format!("list {}", source.resource))?;

        Ok(records
            .iter()
            .filter_map(|record| record.get(source.group_field).and_then(Value::as_str))
            .map(|group| LeafMember::new(group, scope.name.clone()))
            .collect())
    }
}
