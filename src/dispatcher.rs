//! Request dispatcher
//!
//! Thin adapter between a host shell and [`SigningService`]. A call names a
//! method and carries string arguments; the reply is either a base64 string
//! or an error code plus message.
//!
//! | method            | required                           | optional |
//! |-------------------|------------------------------------|----------|
//! | `generateKeypair` | `rp_id`                            | `key_id` |
//! | `sign`            | `rp_id`, `nonce`, `device_id`, `otp` | `key_id` |
//!
//! Required arguments are checked here, before the service runs, so a
//! malformed call has no side effects. Non-string values count as missing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorCode, SignerError};
use crate::service::SigningService;

pub const METHOD_GENERATE_KEYPAIR: &str = "generateKeypair";
pub const METHOD_SIGN: &str = "sign";

/// Inbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Map::new(),
        }
    }

    /// Add a string argument
    pub fn arg(mut self, name: &str, value: &str) -> Self {
        self.arguments
            .insert(name.to_owned(), Value::String(value.to_owned()));
        self
    }

    /// Non-blank string argument, if present
    fn string_arg(&self, name: &str) -> Option<&str> {
        self.arguments
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Error half of a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodError {
    pub code: ErrorCode,
    pub message: String,
}

/// Reply to one [`MethodCall`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MethodError>,
}

impl MethodResponse {
    pub fn success(result: String) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(MethodError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Error code, if this is a failure
    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

impl From<Result<String, SignerError>> for MethodResponse {
    fn from(result: Result<String, SignerError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => Self::error(e.code(), e.to_string()),
        }
    }
}

/// Routes [`MethodCall`]s to a [`SigningService`]
pub struct Dispatcher {
    service: SigningService,
}

impl Dispatcher {
    pub fn new(service: SigningService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &SigningService {
        &self.service
    }

    /// Handle one raw line from a byte channel
    ///
    /// Bytes that are not UTF-8 get a `bad_args` reply like any other
    /// malformed call.
    pub fn handle_bytes(&self, line: &[u8]) -> MethodResponse {
        match std::str::from_utf8(line) {
            Ok(text) => self.handle_json(text),
            Err(e) => MethodResponse::error(ErrorCode::BadArgs, format!("call is not UTF-8: {e}")),
        }
    }

    /// Parse one JSON-encoded call and handle it
    pub fn handle_json(&self, line: &str) -> MethodResponse {
        match serde_json::from_str::<MethodCall>(line) {
            Ok(call) => self.handle(&call),
            Err(e) => MethodResponse::error(ErrorCode::BadArgs, format!("malformed call: {e}")),
        }
    }

    pub fn handle(&self, call: &MethodCall) -> MethodResponse {
        match call.method.as_str() {
            METHOD_GENERATE_KEYPAIR => {
                let Some(rp_id) = call.string_arg("rp_id") else {
                    return MethodResponse::error(ErrorCode::BadArgs, "rp_id is required");
                };
                self.service
                    .generate_keypair(rp_id, call.string_arg("key_id"))
                    .into()
            }
            METHOD_SIGN => {
                let (Some(rp_id), Some(nonce), Some(device_id), Some(otp)) = (
                    call.string_arg("rp_id"),
                    call.string_arg("nonce"),
                    call.string_arg("device_id"),
                    call.string_arg("otp"),
                ) else {
                    return MethodResponse::error(
                        ErrorCode::BadArgs,
                        "rp_id, nonce, device_id, and otp are required",
                    );
                };
                self.service
                    .sign(rp_id, nonce, device_id, otp, call.string_arg("key_id"))
                    .into()
            }
            other => MethodResponse::error(
                ErrorCode::NotImplemented,
                format!("unknown method {other:?}"),
            ),
        }
    }
}
