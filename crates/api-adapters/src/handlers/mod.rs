//! HTTP handlers, one module per resource.

pub mod ads;
pub mod auth;
pub mod categories;
pub mod favorites;
pub mod health;
pub mod images;

use serde::Serialize;

/// Body of delete confirmations.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
