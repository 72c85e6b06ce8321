//! Business request description.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// File part of a multipart upload.
#[derive(Clone, Debug)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// MIME type guessed from the file name.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Request body variants.
///
/// Bodies are rebuilt on every send so a request can be retried.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Fields and files carried over into a multipart body.
    ///
    /// A JSON body has no multipart form and is replaced.
    pub(crate) fn into_multipart(self) -> (Vec<(String, String)>, Vec<FilePart>) {
        match self {
            RequestBody::Multipart { fields, files } => (fields, files),
            RequestBody::Form(fields) => (fields, Vec::new()),
            RequestBody::Json(_) => {
                tracing::warn!("JSON body replaced by multipart upload");
                (Vec::new(), Vec::new())
            }
            RequestBody::Empty => (Vec::new(), Vec::new()),
        }
    }
}

/// A call relative to a client's base URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
    pub raw_response: bool,
    pub timeout: Option<Duration>,
    pub description: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: Vec::new(),
            body: RequestBody::Empty,
            raw_response: false,
            timeout: None,
            description: None,
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

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json_from<T: Serialize>(self, body: &T) -> Result<Self> {
        Ok(self.json(serde_json::to_value(body)?))
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    /// Attach a file; the body becomes multipart and keeps form fields as
    /// text parts. A JSON body set earlier is dropped.
    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let (fields, mut files) = std::mem::take(&mut self.body).into_multipart();
        files.push(FilePart::new(field, file_name, bytes));
        self.body = RequestBody::Multipart { fields, files };
        self
    }

    pub fn raw_response(mut self) -> Self {
        self.raw_response = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
