//! Request URL synthesis, including proxy path rewriting.

use url::Url;

use crate::data::Server;
use crate::error::{CdnError, Result};

/// Version segment baked into manifest request paths.
pub const MANIFEST_VERSION: u32 = 5;

/// Build the request URL for `command` against `server`.
///
/// `query` is attached verbatim when present; the CDN auth token format is
/// opaque to this crate. When `proxy` names a server flagged for proxy use
/// that carries a non-empty path template, the request is steered at the
/// proxy and the path is rewritten through the template's
/// `%host%`/`%path%` tokens. A proxy without a usable template is ignored.
pub fn build_command(
    server: &Server,
    command: &str,
    query: Option<&str>,
    proxy: Option<&Server>,
) -> Result<Url> {
    let command_path = format!("/{command}");
    let (target, path) = match proxy_template(proxy) {
        Some((proxy_server, template)) => {
            let rewritten = template
                .replace("%host%", &server.host)
                .replace("%path%", &command_path);
            (proxy_server, rewritten)
        }
        None => (server, command_path),
    };

    let mut url = Url::parse(&format!(
        "{}://{}:{}",
        target.scheme, target.host, target.port
    ))
    .map_err(|e| CdnError::InvalidUrl(e.to_string()))?;
    url.set_path(&path);
    url.set_query(query);
    Ok(url)
}

fn proxy_template(proxy: Option<&Server>) -> Option<(&Server, &str)> {
    let proxy = proxy?;
    if !proxy.use_as_proxy {
        return None;
    }
    let template = proxy.proxy_path_template.as_deref()?;
    if template.is_empty() {
        return None;
    }
    Some((proxy, template))
}
