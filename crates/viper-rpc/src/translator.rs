// crates/viper-rpc/src/translator.rs
//
// Conversion between JSON-RPC envelopes and the Viper Network native format.
//
// Method mapping:
//   viper_height   -> Height       (no params)
//   viper_balance  -> Balance      [address, height?] | {address, height?}
//   viper_block    -> Block        [height] | {height}
//   viper_tx       -> Transaction  [hash] | {hash}
//   viper_relay    -> Relay        {blockchain, data, method?, path?}
//   anything else  -> Call         {method, params} passed through by name
//
// The native format carries no correlation id, so the response side re-reads
// the original request to echo `id` and `jsonrpc` back to the client.

use bytes::Bytes;
use serde_json::Value;

use viper_core::{
    BalanceQuery, BlockQuery, CallRequest, DispatchError, NativeRequest, NativeResponse, RelayPayload,
    RelayRequest, RequestKind, RpcRequest, RpcResponse, TransactionQuery,
};

/// JSON-RPC code used when the native error carries none of its own.
const NATIVE_ERROR_CODE: i64 = -32000;

/// Default HTTP verb for relayed payloads.
const DEFAULT_RELAY_METHOD: &str = "POST";

// ---------------------------------------------------------------------------
// JSON-RPC -> native
// ---------------------------------------------------------------------------

/// Convert a raw JSON-RPC request into a native Viper Network request.
pub fn to_native_format(raw: &[u8]) -> Result<(RequestKind, NativeRequest), DispatchError> {
    let request = parse_envelope(raw)?;
    let kind = method_kind(&request.method);
    let params = &request.params;

    let native = match kind {
        RequestKind::Height => NativeRequest::Empty {},
        RequestKind::Balance => NativeRequest::Balance(BalanceQuery {
            address: required_str(params, 0, "address")?,
            height: optional_height(params, 1)?,
        }),
        RequestKind::Block => NativeRequest::Block(BlockQuery {
            height: optional_height(params, 0)?,
        }),
        RequestKind::Transaction => NativeRequest::Transaction(TransactionQuery {
            hash: required_str(params, 0, "hash")?,
        }),
        RequestKind::Relay => NativeRequest::Relay(relay_request(params)?),
        RequestKind::Call => NativeRequest::Call(CallRequest {
            method: request.method.clone(),
            params: params.clone(),
        }),
    };

    Ok((kind, native))
}

fn parse_envelope(raw: &[u8]) -> Result<RpcRequest, DispatchError> {
    serde_json::from_slice(raw)
        .map_err(|e| DispatchError::TranslationFailed(format!("invalid JSON-RPC envelope: {}", e)))
}

fn method_kind(method: &str) -> RequestKind {
    match method {
        "viper_height" => RequestKind::Height,
        "viper_balance" => RequestKind::Balance,
        "viper_block" => RequestKind::Block,
        "viper_tx" => RequestKind::Transaction,
        "viper_relay" => RequestKind::Relay,
        _ => RequestKind::Call,
    }
}

/// Look up a parameter by position (array params) or by name (object params).
fn param<'a>(params: &'a Value, index: usize, name: &str) -> Option<&'a Value> {
    match params {
        Value::Array(items) => items.get(index),
        Value::Object(map) => map.get(name),
        _ => None,
    }
    .filter(|v| !v.is_null())
}

fn required_str(params: &Value, index: usize, name: &str) -> Result<String, DispatchError> {
    match param(params, index, name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(DispatchError::TranslationFailed(format!(
            "parameter {} must be a non-empty string",
            name
        ))),
        None => Err(DispatchError::TranslationFailed(format!(
            "missing parameter {}",
            name
        ))),
    }
}

/// Heights may be given as numbers or decimal strings; absent means latest (0).
fn optional_height(params: &Value, index: usize) -> Result<u64, DispatchError> {
    let invalid = || {
        DispatchError::TranslationFailed(
            "parameter height must be a non-negative integer".to_string(),
        )
    };
    match param(params, index, "height") {
        None => Ok(0),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid),
        Some(Value::String(s)) => s.parse::<u64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn relay_request(params: &Value) -> Result<RelayRequest, DispatchError> {
    if !params.is_object() {
        return Err(DispatchError::TranslationFailed(
            "viper_relay expects named params".to_string(),
        ));
    }
    let blockchain = required_str(params, 0, "blockchain")?;

    // Structured payloads are forwarded as their JSON text.
    let data = match param(params, 0, "data") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_json::to_string(other)?,
        None => {
            return Err(DispatchError::TranslationFailed(
                "missing parameter data".to_string(),
            ))
        }
    };

    let method = match param(params, 0, "method") {
        Some(Value::String(s)) => s.clone(),
        _ => DEFAULT_RELAY_METHOD.to_string(),
    };
    let path = match param(params, 0, "path") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };

    Ok(RelayRequest {
        blockchain,
        payload: RelayPayload { data, method, path },
    })
}

// ---------------------------------------------------------------------------
// native -> JSON-RPC
// ---------------------------------------------------------------------------

/// Convert a native Viper Network response into JSON-RPC response bytes,
/// answering the request found in `original`.
pub fn from_native_format(
    response: &NativeResponse,
    original: &[u8],
) -> Result<Bytes, DispatchError> {
    let request = parse_envelope(original)?;
    let kind = method_kind(&request.method);

    let body: Value = serde_json::from_slice(&response.body).map_err(|e| {
        DispatchError::TranslationFailed(format!("undecodable native response: {}", e))
    })?;

    let envelope = match native_error(response.status, &body) {
        Some((code, message)) => RpcResponse::failure(request.id, code, message),
        None => RpcResponse::success(request.id, native_result(kind, body)),
    }
    .with_version(request.jsonrpc);

    Ok(Bytes::from(envelope.to_bytes()?))
}

/// Extract `(code, message)` when the native response denotes a failure.
fn native_error(status: u16, body: &Value) -> Option<(i64, String)> {
    let code = body.get("code").and_then(Value::as_i64);
    let message = body
        .get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string);

    match (code, message) {
        (Some(code), Some(message)) => Some((code, message)),
        (code, message) if !(200..300).contains(&status) => Some((
            code.unwrap_or(NATIVE_ERROR_CODE),
            message.unwrap_or_else(|| format!("Viper Network returned status {}", status)),
        )),
        _ => None,
    }
}

fn native_result(kind: RequestKind, body: Value) -> Value {
    let field = match kind {
        RequestKind::Height => "height",
        RequestKind::Balance => "balance",
        RequestKind::Relay => "response",
        RequestKind::Call => "result",
        RequestKind::Block | RequestKind::Transaction => return body,
    };

    let extracted = match body.get(field) {
        // Relay responses are the target chain's raw answer, usually JSON text.
        Some(Value::String(text)) if kind == RequestKind::Relay => {
            Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone())))
        }
        Some(value) => Some(value.clone()),
        None => None,
    };
    extracted.unwrap_or(body)
}
