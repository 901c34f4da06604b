//! Default HTML directory listing.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use axum::response::Response;
use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::response::{send_data, Payload};
use crate::routing::context::DispatchContext;

/// Renders a directory given its entries in listing order.
pub type ListFn = Arc<dyn Fn(&DispatchContext, &Path, &[String]) -> Response + Send + Sync>;

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

pub fn default_listing() -> ListFn {
    Arc::new(|ctx: &DispatchContext, _dir: &Path, entries: &[String]| {
        send_data(ctx, Payload::html(render(&ctx.path, entries)))
    })
}

/// HTML page with one link per entry, each pointing at `join(url, entry)`.
pub fn render(url: &str, entries: &[String]) -> String {
    let base = url.trim_end_matches('/');
    let title = encode_text(if url.is_empty() { "/" } else { url });

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><title>Index of {title}</title></head><body><h3>Index of {title}</h3><ul>"
    );
    for entry in entries {
        let href = format!("{}/{}", base, utf8_percent_encode(entry, SEGMENT));
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            encode_double_quoted_attribute(&href),
            encode_text(entry)
        );
    }
    html.push_str("</ul></body></html>");
    html
}
