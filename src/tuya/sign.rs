use std::fmt;
use std::io;

use anyhow::{Context as _, Result};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize as _;
use serde_json::Value;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SIGN_METHOD: &str = "HMAC-SHA256";

#[derive(Clone)]
pub struct Credentials {
    pub access_id: String,

    pub access_key: String,
}

impl Credentials {
    pub fn new(access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }

    /// Access id cut to its first 8 characters, for log lines.
    pub fn access_id_hint(&self) -> &str {
        match self.access_id.char_indices().nth(8) {
            Some((i, _)) => &self.access_id[..i],
            None => &self.access_id,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &format_args!("{}...", self.access_id_hint()))
            .field("access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RequestBody<'a> {
    Json(&'a Value),
    Raw(&'a str),
}

impl RequestBody<'_> {
    fn content(&self) -> Result<String> {
        match self {
            RequestBody::Json(value) if is_falsy(value) => Ok(String::new()),
            RequestBody::Json(value) => to_vendor_json(value),
            RequestBody::Raw(raw) => Ok((*raw).to_owned()),
        }
    }
}

/// Null, false, zero and empty strings or containers sign like a missing body.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Renders `value` with `", "` and `": "` separators and non-ASCII escaped as `\uXXXX`,
/// the body layout the vendor's reference signer hashes.
fn to_vendor_json(value: &Value) -> Result<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    value
        .serialize(&mut serializer)
        .context("failed to serialize request body")?;

    String::from_utf8(out).context("request body is not UTF-8")
}

struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        for c in fragment.chars() {
            if c.is_ascii() && c != '\u{7f}' {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub client_id: String,

    pub sign: String,

    pub t: String,

    pub sign_method: &'static str,

    pub access_token: String,
}

impl SignedHeaders {
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let pairs = [
            ("client_id", self.client_id.as_str()),
            ("sign", self.sign.as_str()),
            ("t", self.t.as_str()),
            ("sign_method", self.sign_method),
            ("access_token", self.access_token.as_str()),
        ];

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.insert(HeaderName::from_static(name), value);
        }

        Ok(headers)
    }
}

/// Signs one vendor API call.
///
/// The string to sign is `access_id + token + t + method "\n" sha256(body) "\n" "\n" path`,
/// MACed with the access key and rendered as uppercase hex.
pub fn sign_request(
    credentials: &Credentials,
    token: Option<&str>,
    method: &str,
    path: &str,
    body: Option<RequestBody<'_>>,
    timestamp_ms: i64,
) -> Result<SignedHeaders> {
    let content = match body {
        Some(body) => body.content()?,
        None => String::new(),
    };
    let content_hash = hex::encode(Sha256::digest(content.as_bytes()));

    let canonical = format!("{method}\n{content_hash}\n\n{path}");
    let token = token.unwrap_or_default();
    let t = timestamp_ms.to_string();

    let mut mac = HmacSha256::new_from_slice(credentials.access_key.as_bytes())
        .context("failed to initialize HMAC")?;
    mac.update(credentials.access_id.as_bytes());
    mac.update(token.as_bytes());
    mac.update(t.as_bytes());
    mac.update(canonical.as_bytes());
    let sign = hex::encode_upper(mac.finalize().into_bytes());

    Ok(SignedHeaders {
        client_id: credentials.access_id.clone(),
        sign,
        t,
        sign_method: SIGN_METHOD,
        access_token: token.to_owned(),
    })
}
