use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use url::Url;

/// A boxed stream type for HTTP response bodies.
///
/// This type alias simplifies the complex stream type used throughout the crate.
/// The stream yields `Result<Bytes, E>` where E is the error type from the HTTP client.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A streaming HTTP response.
///
/// Carries the pieces the pipeline judges for itself: the status code, the
/// declared `Content-Length` and the body as a stream of byte chunks.
pub struct HttpResponse<E> {
    /// HTTP status code.
    pub status: u16,

    /// Declared `Content-Length`, if the server sent one.
    pub content_length: Option<u64>,

    /// Response body.
    pub body: BoxStream<'static, Result<Bytes, E>>,
}

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the minimal interface needed for content downloads.
/// Implementations handle their own connection pooling, redirect following
/// and TLS configuration.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + 'static;

    /// Issue a GET request and return the streaming response.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Errors
    ///
    /// Returns an error only when the request cannot be carried out at the
    /// transport level (DNS failure, connection refused, TLS handshake).
    /// An HTTP error status is not a transport failure; it is reported
    /// through [`HttpResponse::status`] and judged by the caller.
    fn send(
        &self,
        url: Url,
    ) -> impl Future<Output = std::result::Result<HttpResponse<Self::Error>, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use crate::error::{CdnError, Result};

    /// Production HTTP client implementation using reqwest.
    ///
    /// Cloning is cheap; clones share the underlying connection pool.
    #[derive(Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a new ReqwestClient with default configuration.
        ///
        /// # Errors
        ///
        /// Returns an error if the underlying TLS backend cannot be
        /// initialized.
        pub fn new() -> Result<Self> {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| CdnError::Transport(e.to_string()))?;
            Ok(Self { client })
        }

        /// Wrap an existing reqwest client, keeping its configuration.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn send(
            &self,
            url: Url,
        ) -> std::result::Result<HttpResponse<Self::Error>, Self::Error> {
            let response = self.client.get(url).send().await?;

            let status = response.status().as_u16();
            let content_length = response.content_length();
            let body = Box::pin(response.bytes_stream());

            Ok(HttpResponse {
                status,
                content_length,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
