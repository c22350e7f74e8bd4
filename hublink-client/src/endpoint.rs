//! Hub endpoint URL construction.

use url::Url;

/// Returns `<base>/<hub>`, keeping any query string on the base URL.
///
/// The base URL is always treated as a directory, so a base path of
/// `/api` yields `/api/<hub>` rather than replacing `api`.
pub fn hub_url(base: &str, hub: &str) -> Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| format!("{}: {}", base, e))?;
    if url.cannot_be_a_base() {
        return Err(format!("{}: not a hierarchical URL", base));
    }

    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        hub.trim_matches('/')
    );
    url.set_path(&path);
    Ok(url)
}

/// Returns the negotiate endpoint, `<base>/<hub>/negotiate`.
pub fn negotiate_url(base: &str, hub: &str) -> Result<Url, String> {
    let mut url = hub_url(base, hub)?;
    let path = format!("{}/negotiate", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// Returns the socket URL for a hub URL and connection id.
///
/// `https` becomes `wss` and `http` becomes `ws`. Existing query
/// parameters are kept; `id` is set to the connection id, replacing any
/// earlier `id`.
pub fn socket_url(hub_url: &Url, connection_id: &str) -> Result<Url, String> {
    let scheme = match hub_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(format!("unsupported scheme '{}'", other)),
    };

    let mut url = hub_url.clone();
    url.set_scheme(scheme)
        .map_err(|_| format!("cannot switch {} to {}", hub_url, scheme))?;

    let params: Vec<(String, String)> = hub_url
        .query_pairs()
        .filter(|(key, _)| key != "id")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(params)
        .append_pair("id", connection_id);

    Ok(url)
}
