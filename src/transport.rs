//! The network side the mapper talks to, and decoding of server-reported errors.

// transport calls are asynchronous; boxing keeps the trait object-safe
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{MapperError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
    pub fn has_body(&self) -> bool {
        self.body.iter().any(|b| !b.is_ascii_whitespace())
    }
}

/// Issues requests and hands back status and raw bytes. Failing to reach
/// the server at all is a [`MapperError::Transport`]; any answer, including
/// non-2xx ones, is a [`Response`].
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response>>;
    fn post<'a>(&'a self, url: &'a str, body: &'a Json) -> BoxFuture<'a, Result<Response>>;
    fn put<'a>(&'a self, url: &'a str, body: &'a Json) -> BoxFuture<'a, Result<Response>>;
    fn delete<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response>>;
}

// {"errors": [{"id": <code>, "title": <string>}]}
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    id: Option<Json>,
    title: Option<String>,
}

/// Turns a non-2xx response into [`MapperError::ServerReported`]. The code
/// comes from the first error's `id` when it is numeric, else the HTTP status.
pub fn server_error(response: &Response) -> MapperError {
    let first = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.errors.into_iter().next());
    let (code, title) = match first {
        Some(entry) => {
            let code = match entry.id {
                Some(Json::Number(n)) => n.as_i64(),
                Some(Json::String(s)) => s.parse::<i64>().ok(),
                _ => None,
            };
            (code, entry.title)
        }
        None => (None, None),
    };
    MapperError::ServerReported {
        code: code.unwrap_or(response.status as i64),
        title,
    }
}

/// Passes 2xx responses through and converts everything else.
pub fn successful(response: Response) -> Result<Response> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(server_error(&response))
    }
}
