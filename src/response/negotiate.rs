//! Content-Encoding negotiation.
//!
//! # Design Decisions
//! - Fixed preference: gzip, then deflate, then identity
//! - Client q-values only matter when they are zero (explicit refusal)
//! - A missing or unreadable header means identity

use axum::http::{header, HeaderMap, HeaderValue};

/// Body encoding chosen for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
    Identity,
}

impl Encoding {
    /// Pick an encoding from the request's `Accept-Encoding`.
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let Some(value) = headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
        else {
            return Encoding::Identity;
        };

        let mut gzip = false;
        let mut deflate = false;
        for token in value.split(',') {
            let mut parts = token.split(';');
            let name = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            if parts.any(refuses) {
                continue;
            }
            match name.as_str() {
                "gzip" | "x-gzip" => gzip = true,
                "deflate" => deflate = true,
                _ => {}
            }
        }

        if gzip {
            Encoding::Gzip
        } else if deflate {
            Encoding::Deflate
        } else {
            Encoding::Identity
        }
    }

    /// Value for the `Content-Encoding` header, if any.
    pub fn header_value(self) -> Option<HeaderValue> {
        match self {
            Encoding::Gzip => Some(HeaderValue::from_static("gzip")),
            Encoding::Deflate => Some(HeaderValue::from_static("deflate")),
            Encoding::Identity => None,
        }
    }
}

fn refuses(param: &str) -> bool {
    let Some((key, value)) = param.split_once('=') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().map(|q| q <= 0.0).unwrap_or(false)
}
