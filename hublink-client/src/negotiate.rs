//! Negotiate request.

use crate::config::HubConfig;
use crate::endpoint;
use crate::error::ClientError;
use crate::tls::read_pem;
use hublink_protocol::NegotiateResponse;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

/// Builds the HTTP client for negotiate from the hub TLS settings.
pub fn build_http_client(config: &HubConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().use_rustls_tls();

    if config.tls.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(ref ca_path) = config.tls.ca_cert_path {
        let pem = read_pem(ca_path).map_err(ClientError::Connect)?;
        for cert in reqwest::Certificate::from_pem_bundle(&pem).map_err(ClientError::HttpClient)? {
            builder = builder.add_root_certificate(cert);
        }
    }
    if let Some(timeout) = config.connect_timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(ClientError::HttpClient)
}

/// POSTs to `<url>/<hub>/negotiate` and parses the reply.
pub async fn negotiate(config: &HubConfig) -> Result<NegotiateResponse, ClientError> {
    let url =
        endpoint::negotiate_url(&config.url, &config.hub).map_err(ClientError::InvalidUrl)?;
    let http = build_http_client(config)?;

    tracing::debug!("Negotiating with {}", url);
    let response = http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(ClientError::Negotiate)?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to read negotiate error body: {}", e);
                format!("<unreadable body: {}>", e)
            }
        };
        tracing::debug!("Negotiate rejected: {} ({})", status, body);
        return Err(ClientError::NegotiateStatus {
            status: status.as_u16(),
            body,
        });
    }

    let negotiation: NegotiateResponse =
        response.json().await.map_err(ClientError::NegotiateBody)?;
    tracing::debug!(
        "Negotiated connection {} (transports: {:?})",
        negotiation.connection_id,
        negotiation.transport_names()
    );
    Ok(negotiation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsClientConfig;
    use crate::error::{ErrorKind, TransportError};
    use crate::testing::{spawn_negotiate, spawn_raw_http};

    const NEGOTIATE_OK: &str = r#"{"connectionId":"abc","availableTransports":[{"transport":"WebSockets","transferFormats":["Text","Binary"]},{"transport":"LongPolling","transferFormats":["Text"]}]}"#;

    #[tokio::test]
    async fn test_negotiate_success() {
        let (addr, server) = spawn_negotiate(200, NEGOTIATE_OK).await;
        let config = HubConfig::new(format!("http://{}", addr), "gameHub");

        let negotiation = negotiate(&config).await.unwrap();
        assert_eq!(negotiation.connection_id, "abc");
        assert_eq!(
            negotiation.transport_names(),
            vec!["WebSockets", "LongPolling"]
        );

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("post /gamehub/negotiate http/1.1"));
        assert!(head.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_negotiate_non_ok_status() {
        let (addr, server) = spawn_negotiate(404, "\"no such hub\"").await;
        let config = HubConfig::new(format!("http://{}", addr), "missing");

        let err = negotiate(&config).await.unwrap_err();
        match err {
            ClientError::NegotiateStatus { status, ref body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "\"no such hub\"");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::Connection);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_negotiate_non_ok_status_truncated_body() {
        let (addr, server) = spawn_raw_http(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 64\r\nConnection: close\r\n\r\nshort",
        )
        .await;
        let config = HubConfig::new(format!("http://{}", addr), "gameHub");

        let err = negotiate(&config).await.unwrap_err();
        match err {
            ClientError::NegotiateStatus { status, ref body } => {
                assert_eq!(status, 503);
                assert!(body.starts_with("<unreadable body: "), "body: {}", body);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_negotiate_bad_body() {
        let (addr, server) = spawn_negotiate(200, "{\"transports\":true}").await;
        let config = HubConfig::new(format!("http://{}", addr), "gameHub");

        let err = negotiate(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::NegotiateBody(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_negotiate_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = HubConfig::new(format!("http://{}", addr), "gameHub");
        let err = negotiate(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::Negotiate(_)));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_negotiate_invalid_url() {
        let config = HubConfig::new("not a url", "gameHub");
        let err = negotiate(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_http_client_missing_ca() {
        let config = HubConfig::new("https://localhost", "gameHub")
            .with_tls(TlsClientConfig::new().with_ca_cert("/nonexistent/ca.pem"));
        let err = build_http_client(&config).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Connect(TransportError::TlsConfig(_))
        ));
    }

    #[test]
    fn test_http_client_insecure_builds() {
        let config = HubConfig::new("https://localhost", "gameHub")
            .with_tls(TlsClientConfig::new().with_insecure());
        assert!(build_http_client(&config).is_ok());
    }
}
