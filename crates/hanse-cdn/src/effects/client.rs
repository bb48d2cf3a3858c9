use bytes::Bytes;
use futures_util::StreamExt;
use hanse_keys::DepotKey;
use tracing::{debug, error, warn};
use url::Url;

use crate::core::unpack::unpack_single_member;
use crate::core::{Deadline, MANIFEST_VERSION, build_command, transfer_length};
use crate::data::{ChunkData, DepotManifest, Server, Timeouts};
use crate::effects::http::{BoxStream, HttpClient, HttpResponse};
use crate::error::{CdnError, Phase, Result};

/// Content delivery client for manifests and depot chunks.
///
/// The client issues one GET per call and judges the response itself:
/// status codes, declared lengths and time budgets. It never retries;
/// rotation across servers is the caller's policy.
pub struct Client<C: HttpClient> {
    http: C,
    timeouts: Timeouts,
}

impl<C: HttpClient> Client<C> {
    /// Create a client over the given HTTP transport with default timeouts.
    pub fn new(http: C) -> Self {
        Self {
            http,
            timeouts: Timeouts::default(),
        }
    }

    /// Replace the per-call time budgets.
    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Tear down the client, dropping its HTTP handle.
    ///
    /// Requests already in flight on clones of the underlying pool run to
    /// completion on their own.
    pub fn shutdown(self) {
        debug!("content client shut down");
    }

    /// Download and parse a depot manifest.
    ///
    /// The request path is versioned; when `manifest_request_code` is
    /// non-zero it is appended as an extra segment. The response is a zip
    /// envelope whose first member holds the serialized manifest. When
    /// `depot_key` is given, encrypted filenames are decrypted in place.
    ///
    /// # Errors
    ///
    /// Fails on non-2xx status, transport breakage, a body that does not
    /// match its declared `Content-Length`, a malformed envelope or
    /// manifest, or an exhausted time budget.
    pub async fn download_manifest(
        &self,
        depot_id: u32,
        manifest_id: u64,
        manifest_request_code: u64,
        server: &Server,
        depot_key: Option<&DepotKey>,
        proxy: Option<&Server>,
        cdn_auth_token: Option<&str>,
    ) -> Result<DepotManifest> {
        let command = if manifest_request_code > 0 {
            format!(
                "depot/{depot_id}/manifest/{manifest_id}/{MANIFEST_VERSION}/{manifest_request_code}"
            )
        } else {
            format!("depot/{depot_id}/manifest/{manifest_id}/{MANIFEST_VERSION}")
        };
        let url = build_command(server, &command, cdn_auth_token, proxy)?;

        let call = Deadline::after(self.timeouts.call());
        let response = self.issue(url.clone(), call).await?;

        let declared = response.content_length;
        if declared.is_none() {
            debug!(%url, "no content length declared, buffering best effort");
        }
        let envelope = self.read_body(response.body, declared, call).await?;

        let (payload, members) = unpack_single_member(&envelope)?;
        if members != 1 {
            warn!(
                %url,
                members, "manifest envelope has more than one member, parsing the first"
            );
        }

        let mut manifest = DepotManifest::parse(&payload)?;
        if let Some(key) = depot_key {
            manifest.decrypt_filenames(key)?;
        }

        Ok(manifest)
    }

    /// Download one depot chunk into `destination`, returning the number of
    /// bytes written.
    ///
    /// Without a key the raw transfer is streamed straight into
    /// `destination`. With a key the body is staged, decrypted, checksummed
    /// and decompressed, so `destination` must hold the uncompressed size.
    /// A zero length in the chunk metadata means the size is unknown and
    /// is not enforced.
    ///
    /// # Errors
    ///
    /// Fails before any network traffic when the chunk has no id or
    /// `destination` is too small for the advertised size. Otherwise fails
    /// on non-2xx status, transport breakage, length mismatches at either
    /// layer, chunk processing errors or an exhausted time budget.
    pub async fn download_depot_chunk(
        &self,
        depot_id: u32,
        chunk: &ChunkData,
        server: &Server,
        destination: &mut [u8],
        depot_key: Option<&DepotKey>,
        proxy: Option<&Server>,
        cdn_auth_token: Option<&str>,
    ) -> Result<usize> {
        let Some(chunk_id) = chunk.chunk_id.as_deref() else {
            return Err(CdnError::MissingChunkId);
        };
        let needed = if depot_key.is_some() {
            chunk.uncompressed_length as usize
        } else {
            chunk.compressed_length as usize
        };
        if destination.len() < needed {
            return Err(CdnError::BufferTooSmall {
                needed,
                capacity: destination.len(),
            });
        }

        let command = format!("depot/{depot_id}/chunk/{}", hex::encode(chunk_id));
        let url = build_command(server, &command, cdn_auth_token, proxy)?;

        let call = Deadline::after(self.timeouts.call());
        let response = self.issue(url.clone(), call).await?;
        let expected = transfer_length(response.content_length, chunk.compressed_length)?;

        match depot_key {
            None => {
                // Metadata may have been silent about the size until now.
                if (destination.len() as u64) < expected {
                    return Err(CdnError::BufferTooSmall {
                        needed: expected as usize,
                        capacity: destination.len(),
                    });
                }
                call.nested(self.timeouts.response_body)
                    .bound(fill_exact(response.body, destination, expected))
                    .await
                    .map_err(|_| CdnError::Timeout {
                        phase: Phase::ResponseBody,
                    })?
            }
            Some(key) => {
                let staged = self.read_body(response.body, Some(expected), call).await?;
                let written = hanse_keys::process(&staged, key, chunk.checksum, destination)
                    .map_err(|e| {
                        error!(%url, error = %e, "chunk processing failed");
                        CdnError::Process(e)
                    })?;
                if chunk.uncompressed_length > 0 && written != chunk.uncompressed_length as usize {
                    return Err(CdnError::LengthMismatch {
                        declared: u64::from(chunk.uncompressed_length),
                        actual: written as u64,
                    });
                }
                Ok(written)
            }
        }
    }

    /// Issue the request under the request budget and judge the status.
    async fn issue(&self, url: Url, call: Deadline) -> Result<HttpResponse<C::Error>> {
        let response = call
            .nested(self.timeouts.request)
            .bound(self.http.send(url.clone()))
            .await
            .map_err(|_| CdnError::Timeout {
                phase: Phase::Request,
            })?
            .map_err(|e| CdnError::Transport(e.to_string()))?;

        if !(200..300).contains(&response.status) {
            return Err(CdnError::RequestFailed {
                status: response.status,
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// Buffer the whole body under the response body budget.
    async fn read_body(
        &self,
        body: BoxStream<'static, std::result::Result<Bytes, C::Error>>,
        declared: Option<u64>,
        call: Deadline,
    ) -> Result<Vec<u8>> {
        call.nested(self.timeouts.response_body)
            .bound(collect_exact(body, declared))
            .await
            .map_err(|_| CdnError::Timeout {
                phase: Phase::ResponseBody,
            })?
    }
}

/// Collect a body into a buffer, holding it to the declared length.
///
/// Overruns fail as soon as they are observed rather than at end of
/// stream.
async fn collect_exact<E: std::error::Error>(
    mut body: BoxStream<'static, std::result::Result<Bytes, E>>,
    declared: Option<u64>,
) -> Result<Vec<u8>> {
    let mut buffer = match declared {
        Some(n) => Vec::with_capacity(n as usize),
        None => Vec::new(),
    };

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result.map_err(|e| CdnError::Transport(e.to_string()))?;
        if let Some(declared) = declared {
            let running = buffer.len() as u64 + chunk.len() as u64;
            if running > declared {
                return Err(CdnError::LengthMismatch {
                    declared,
                    actual: running,
                });
            }
        }
        buffer.extend_from_slice(&chunk);
    }

    if let Some(declared) = declared {
        if buffer.len() as u64 != declared {
            return Err(CdnError::LengthMismatch {
                declared,
                actual: buffer.len() as u64,
            });
        }
    }

    Ok(buffer)
}

/// Stream a body straight into `destination`, holding it to `expected`.
///
/// The caller has already checked that `destination` can hold `expected`
/// bytes, and overruns fail before any out of bounds write.
async fn fill_exact<E: std::error::Error>(
    mut body: BoxStream<'static, std::result::Result<Bytes, E>>,
    destination: &mut [u8],
    expected: u64,
) -> Result<usize> {
    let mut written = 0usize;

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result.map_err(|e| CdnError::Transport(e.to_string()))?;
        let running = written as u64 + chunk.len() as u64;
        if running > expected {
            return Err(CdnError::LengthMismatch {
                declared: expected,
                actual: running,
            });
        }
        destination[written..written + chunk.len()].copy_from_slice(&chunk);
        written += chunk.len();
    }

    if written as u64 != expected {
        return Err(CdnError::LengthMismatch {
            declared: expected,
            actual: written as u64,
        });
    }

    Ok(written)
}
