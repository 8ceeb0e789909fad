//! Request and response values exchanged with the transport

use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::credential::Credential;
use crate::error::{ClientError, ClientResult};

/// Description of one API call.
///
/// Immutable once built; attaching a credential produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `/orders/42`
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of the first header named `name` (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this request carrying `credential` as its only Authorization header
    pub fn with_credential(&self, credential: Option<&Credential>) -> Self {
        let mut request = self.clone();
        request
            .headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(http::header::AUTHORIZATION.as_str()));
        if let Some(credential) = credential {
            request.headers.push((
                http::header::AUTHORIZATION.as_str().to_string(),
                credential.bearer(),
            ));
        }
        request
    }
}

/// A request plus its single-use retry marker.
///
/// Once `retried` is set, a further 401 is terminal.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request: ApiRequest,
    pub retried: bool,
}

impl PendingRequest {
    pub fn first(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    /// Mark as retried; consumes the first attempt
    pub fn into_retry(self) -> Self {
        Self {
            request: self.request,
            retried: true,
        }
    }
}

/// Structured transport result
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON; an empty body decodes as `null`
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| {
            ClientError::InvalidResponse(format!("{} (status {})", e, self.status.as_u16()))
        })
    }

    /// Convert a non-2xx response into `ClientError::Server`
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::Server {
                status: self.status.as_u16(),
                body: self.body,
            })
        }
    }
}
