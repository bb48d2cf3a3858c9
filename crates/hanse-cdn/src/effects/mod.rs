//! I/O operations for content delivery.
//!
//! This module contains the HTTP seam and the pipeline client built on
//! it. Everything effectful lives here; the layers below stay pure.

mod http;
mod client;

pub use http::{HttpClient, HttpResponse, BoxStream};
pub use client::Client;
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
