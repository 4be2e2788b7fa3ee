// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! Transport failures are classified into the vws error kinds:
//!
//! | reqwest error | [`ErrorKind`] |
//! |---|---|
//! | connect + timeout | [`ErrorKind::ConnectTimeout`] |
//! | timeout | [`ErrorKind::Timeout`] |
//! | anything else | [`ErrorKind::ConnectFailed`] |

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::{debug, warn};
use reqwest::{Client, Request};
use vws_core::{Error, ErrorKind, HttpSend, Result};

/// Bound for establishing a connection used by [`ReqwestHttpSend::default`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Bound for the whole exchange used by [`ReqwestHttpSend::default`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// ReqwestHttpSend sends requests with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
}

impl Default for ReqwestHttpSend {
    /// Create a ReqwestHttpSend bounded by [`DEFAULT_CONNECT_TIMEOUT`] and
    /// [`DEFAULT_TIMEOUT`].
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized, like
    /// [`reqwest::Client::new`].
    fn default() -> Self {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT)
            .expect("reqwest client must build with default timeouts")
    }
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    ///
    /// Timeouts configured on the client (`connect_timeout`, `timeout`) are
    /// honored and reported as distinct error kinds. Without them a stalled
    /// exchange only ends when the call is aborted.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            connect_timeout: None,
            timeout: None,
        }
    }

    /// Create a new ReqwestHttpSend with the two timeout bounds.
    ///
    /// - `connect`: bound for establishing the connection.
    /// - `total`: bound for the whole exchange, including reading the body.
    pub fn with_timeouts(connect: Duration, total: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect)
            .timeout(total)
            .build()
            .map_err(|e| Error::config_invalid("failed to build reqwest client").with_source(e))?;

        Ok(Self {
            client,
            connect_timeout: Some(connect),
            timeout: Some(total),
        })
    }

    /// Connect timeout set through [`ReqwestHttpSend::with_timeouts`], if any.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Total exchange timeout set through [`ReqwestHttpSend::with_timeouts`], if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        debug!("sending request: {} {}", req.method(), req.uri());

        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| classify("failed to send request", e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| classify("failed to read response body", e))?;

        debug!("got response: {} with {} bytes", parts.status, bs.len());
        Ok(http::Response::from_parts(parts, bs))
    }
}

/// Map a reqwest error onto the vws transport error kinds.
fn classify(context: &str, err: reqwest::Error) -> Error {
    let kind = error_kind(err.is_connect(), err.is_timeout());

    warn!("{context}: {kind}: {err}");
    Error::new(kind, format!("{context}: {kind}")).with_source(err)
}

fn error_kind(is_connect: bool, is_timeout: bool) -> ErrorKind {
    match (is_connect, is_timeout) {
        (true, true) => ErrorKind::ConnectTimeout,
        (false, true) => ErrorKind::Timeout,
        _ => ErrorKind::ConnectFailed,
    }
}
