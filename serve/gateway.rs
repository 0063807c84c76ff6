//! HTTP-style request dispatch.
//!
//! The transport is someone else's concern; this module only maps a
//! method, a path and an optional JSON body onto a status code and a JSON
//! body, with the same routes and error shapes the public API exposes.

use crate::context::ServingContext;
use crate::encode::RawRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const HEALTH_PATH: &str = "/";
pub const PREDICT_PATH: &str = "/predict";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            body: None,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Error reply carrying `{"detail": message}`.
    pub fn detail(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Routes one request.
pub fn handle(ctx: &ServingContext, request: &Request) -> Reply {
    match (request.path.as_str(), request.method) {
        (HEALTH_PATH, Method::Get) => match serde_json::to_value(ctx.health()) {
            Ok(body) => Reply::ok(body),
            Err(e) => Reply::detail(500, e.to_string()),
        },
        (PREDICT_PATH, Method::Post) => match &request.body {
            Some(Value::Object(object)) => predict_reply(ctx, &RawRecord::from(object.clone())),
            Some(_) => Reply::detail(422, "Request body must be a JSON object."),
            None => Reply::detail(422, "Request body is required."),
        },
        (HEALTH_PATH | PREDICT_PATH, _) => Reply::detail(405, "Method Not Allowed"),
        _ => Reply::detail(404, "Not Found"),
    }
}

/// Scores one record. Any failure becomes a 500 carrying the error text;
/// no partial result is returned.
pub fn predict_reply(ctx: &ServingContext, record: &RawRecord) -> Reply {
    let outcome = ctx
        .predict(record)
        .map_err(|e| e.to_string())
        .and_then(|response| serde_json::to_value(&response).map_err(|e| e.to_string()));

    match outcome {
        Ok(body) => Reply::ok(body),
        Err(message) => {
            log::warn!("Prediction failed: {message}");
            Reply::detail(500, message)
        }
    }
}
