//! Crate-wide error taxonomy. Every control-plane operation returns either a
//! typed success payload or one of these variants — no duck-typed error
//! dictionaries.

use actix_web::HttpResponse as Http;
use thiserror::Error;

use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no node has capacity: {0}")]
    NoCapacity(String),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub fn to_http_response(&self) -> Http {
        match self {
            Error::Validation(msg) => Http::BadRequest().json(ErrBody::new(msg)),
            Error::CapacityExceeded(msg) => Http::BadRequest().json(ErrBody::new(msg)),
            Error::NotFound(msg) => Http::NotFound().json(ErrBody::new(msg)),
            Error::NoCapacity(msg) => Http::BadRequest().json(ErrBody::new(msg)),
            Error::Runtime(err) => Http::BadRequest().json(ErrBody::new(&err.to_string())),
            Error::Conflict(msg) => Http::Conflict().json(ErrBody::new(msg)),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrBody {
    error: String,
}

impl ErrBody {
    fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}
