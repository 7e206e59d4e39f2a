//! Parsing of the `createOrder` response.
//!
//! The gateway answers either with JSON, or (when `isHtml=1` is honoured) with an HTML page that redirects the
//! browser via `window.location.href = '...'`. That page is sometimes served as GBK. Each shape is handled by its own
//! pure function, and [`parse_create_order_response`] tries them in order.
use encoding_rs::GBK;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::GatewayError;

static CHARSET_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?\s*(gbk|gb2312)"#).unwrap());
static REDIRECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)window\.location\.href\s*=\s*(?:'([^']+)'|"([^"]+)")"#).unwrap());
static ORDER_ID_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]orderId=([^&#]*)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Json { pay_url: String, gateway_order_id: Option<String> },
    HtmlRedirect { pay_url: String, gateway_order_id: Option<String> },
    Rejected { code: i64, message: String },
    Unrecognized,
}

#[derive(Deserialize)]
struct GatewayJson {
    code: Value,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// The gateway is loose about whether codes are numbers or strings.
fn json_code(code: &Value) -> Option<i64> {
    match code {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_create_order_response(base_url: &str, body: &[u8]) -> ParsedResponse {
    try_json(body).or_else(|| try_html_redirect(base_url, body)).unwrap_or(ParsedResponse::Unrecognized)
}

/// Returns `None` if the body is not a gateway JSON document at all.
pub fn try_json(body: &[u8]) -> Option<ParsedResponse> {
    let doc = serde_json::from_slice::<GatewayJson>(body).ok()?;
    let code = json_code(&doc.code)?;
    if code != 1 {
        let message = doc.msg.filter(|m| !m.is_empty()).unwrap_or_else(|| "payment gateway error".to_string());
        return Some(ParsedResponse::Rejected { code, message });
    }
    let data = doc.data.unwrap_or(Value::Null);
    let pay_url = data.get("payUrl").and_then(value_as_string);
    let gateway_order_id = data.get("orderId").and_then(value_as_string);
    match pay_url {
        Some(pay_url) => Some(ParsedResponse::Json { pay_url, gateway_order_id }),
        None => Some(ParsedResponse::Unrecognized),
    }
}

/// Returns `None` if no redirect assignment is found in the (decoded) body.
pub fn try_html_redirect(base_url: &str, body: &[u8]) -> Option<ParsedResponse> {
    let html = decode_html(body);
    let captures = REDIRECT.captures(&html)?;
    let target = captures.get(1).or_else(|| captures.get(2))?.as_str().trim();
    let gateway_order_id = extract_order_id(target);
    let pay_url = join_url(base_url, target);
    Some(ParsedResponse::HtmlRedirect { pay_url, gateway_order_id })
}

/// Decodes the body as GBK when it declares a GBK/GB2312 charset, and as (lossy) UTF-8 otherwise.
pub fn decode_html(body: &[u8]) -> String {
    let ascii_view = String::from_utf8_lossy(body);
    if CHARSET_MARKER.is_match(&ascii_view) {
        let (decoded, _, _) = GBK.decode(body);
        decoded.into_owned()
    } else {
        ascii_view.into_owned()
    }
}

pub fn extract_order_id(target: &str) -> Option<String> {
    ORDER_ID_QUERY
        .captures(target)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// `closeOrder` only ever answers with JSON. Success is `code == 1` and nothing else.
pub fn parse_close_order_response(body: &[u8]) -> Result<(), GatewayError> {
    let doc = serde_json::from_slice::<GatewayJson>(body).map_err(|_| GatewayError::UnparseableResponse)?;
    match json_code(&doc.code) {
        Some(1) => Ok(()),
        Some(code) => {
            let message = doc.msg.filter(|m| !m.is_empty()).unwrap_or_else(|| "failed to close order".to_string());
            Err(GatewayError::Rejected { code, message })
        },
        None => Err(GatewayError::UnparseableResponse),
    }
}

fn join_url(base_url: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if target.starts_with('/') {
        format!("{base}{target}")
    } else {
        format!("{base}/{target}")
    }
}
