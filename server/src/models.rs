use crate::error::TargetError;
use axum::http::{header, HeaderMap, HeaderName, Method};
use std::fmt;
use url::{form_urlencoded, Url};

pub const TARGET_PARAM: &str = "externalApiUrl";

/// Query string grouped by key. Keys keep their first-seen order and each key
/// keeps its values in arrival order. A segment without `=` contributes `None`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<Option<String>>)>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();

        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = match pair.split_once('=') {
                Some((key, _)) => (key, Some(decode_value(pair))),
                None => (pair, None),
            };
            params.push(key, value);
        }

        params
    }

    fn push(&mut self, key: &str, value: Option<String>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key.to_string(), vec![value])),
        }
    }

    /// First value recorded for `key`. `None` when the key is absent or its
    /// first occurrence had no `=`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().and_then(|v| v.as_deref())
    }

    pub fn get_all(&self, key: &str) -> &[Option<String>] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    #[cfg(test)]
    fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

// form_urlencoded splits on the first '=' only, so the decoded value of the
// whole segment is exactly the decoded right-hand side.
fn decode_value(pair: &str) -> String {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// Validated upstream address taken from `externalApiUrl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    pub fn from_query(params: &QueryParams) -> Result<Self, TargetError> {
        let raw = params.first(TARGET_PARAM).ok_or(TargetError::Missing)?;
        Self::parse(raw)
    }

    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        if raw.is_empty() {
            return Err(TargetError::Empty);
        }
        // Url::parse rewrites what it can instead of failing, so anything it
        // would have to repair is rejected up front.
        if !is_well_formed(raw) {
            return Err(TargetError::Malformed(raw.to_string()));
        }
        Url::parse(raw)
            .map(Self)
            .map_err(|_| TargetError::Malformed(raw.to_string()))
    }

    pub fn into_url(self) -> Url {
        self.0
    }
}

/// Schemes for which the URL parser would invent a missing `//`.
const SPECIAL_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "ftp", "file"];

fn is_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\\' | b'<' | b'>' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`' => return false,
            b'%' if !is_escape(bytes.get(i + 1..i + 3)) => return false,
            _ => {}
        }
    }
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    match raw.split_once(':') {
        Some((scheme, rest)) if SPECIAL_SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)) => {
            rest.starts_with("//")
        }
        _ => true,
    }
}

fn is_escape(digits: Option<&[u8]>) -> bool {
    matches!(digits, Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The only two methods the relay sends upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMethod {
    Get,
    Post,
}

impl From<&Method> for RelayMethod {
    fn from(method: &Method) -> Self {
        // PUT, DELETE and friends go out as a bodiless GET.
        if *method == Method::POST {
            RelayMethod::Post
        } else {
            RelayMethod::Get
        }
    }
}

impl From<RelayMethod> for Method {
    fn from(method: RelayMethod) -> Self {
        match method {
            RelayMethod::Get => Method::GET,
            RelayMethod::Post => Method::POST,
        }
    }
}

/// Headers owned by a single connection hop. The transport on each side
/// writes its own, so they are never carried across.
const HOP_HEADERS: &[HeaderName] = &[
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

const HOP_HEADER_NAMES: &[&str] = &["keep-alive", "proxy-connection"];

const CONTENT_HEADERS: &[HeaderName] = &[header::EXPIRES, header::LAST_MODIFIED, header::ALLOW];

fn is_hop_header(name: &HeaderName) -> bool {
    HOP_HEADERS.contains(name) || HOP_HEADER_NAMES.contains(&name.as_str())
}

fn is_content_header(name: &HeaderName) -> bool {
    name.as_str().starts_with("content-") || CONTENT_HEADERS.contains(name)
}

/// Header collection that moves values between the inbound request, the
/// upstream request and the final response without re-validating them.
/// Values stay opaque bytes and repeated keys keep every value.
#[derive(Debug, Default, Clone)]
pub struct PassThroughHeaders(HeaderMap);

impl PassThroughHeaders {
    /// Headers for the outbound request: everything the caller sent except
    /// hop headers.
    pub fn from_inbound(headers: &HeaderMap) -> Self {
        let mut out = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers.iter().filter(|(name, _)| !is_hop_header(name)) {
            out.append(name.clone(), value.clone());
        }
        Self(out)
    }

    /// Headers for the final response: general headers first, then content
    /// headers, each group in upstream order. `content-length` is kept here
    /// because the body is relayed unchanged.
    pub fn from_upstream(headers: &HeaderMap) -> Self {
        let mut out = HeaderMap::with_capacity(headers.len());
        let relayed = headers
            .iter()
            .filter(|(name, _)| **name == header::CONTENT_LENGTH || !is_hop_header(name));

        let (content, general): (Vec<_>, Vec<_>) =
            relayed.partition(|(name, _)| is_content_header(name));
        for (name, value) in general.into_iter().chain(content) {
            out.append(name.clone(), value.clone());
        }
        Self(out)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> HeaderMap {
        self.0
    }
}
