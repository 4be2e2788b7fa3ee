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

//! Dispatch of signed requests and delivery of their outcome.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use bytes::Bytes;
use log::{debug, error, warn};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use vws_core::{Context, Error, ErrorKind, Result};

use crate::response::{parse, ServiceResponse, TransportError};

/// State of a single request.
///
/// A request moves `Created -> Sent` and then into exactly one terminal
/// state. States are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// The request is built and signed.
    Created,
    /// The request is handed to the transport.
    Sent,
    /// A response body was received.
    Finished,
    /// The exchange failed with a connection error.
    Error,
    /// The exchange was aborted by the caller.
    Aborted,
    /// The connection could not be established in time.
    ConnectionTimedOut,
    /// The exchange did not complete in time.
    TimedOut,
}

impl RequestState {
    /// Check if no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Created | RequestState::Sent)
    }

    fn can_transit(&self, next: RequestState) -> bool {
        match self {
            RequestState::Created => next == RequestState::Sent,
            RequestState::Sent => next.is_terminal(),
            _ => false,
        }
    }
}

impl From<ErrorKind> for RequestState {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Aborted => RequestState::Aborted,
            ErrorKind::ConnectTimeout => RequestState::ConnectionTimedOut,
            ErrorKind::Timeout => RequestState::TimedOut,
            _ => RequestState::Error,
        }
    }
}

/// Tracks the state of one exchange and logs every transition.
struct Exchange {
    target: String,
    state: RequestState,
}

impl Exchange {
    fn new(req: &http::Request<Bytes>) -> Self {
        Self {
            target: format!("{} {}", req.method(), req.uri().path()),
            state: RequestState::Created,
        }
    }

    fn transit(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_transit(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{}: {:?} -> {:?}", self.target, self.state, next);
        self.state = next;
    }
}

/// AbortHandle cancels an in-flight call.
///
/// Aborting a call that is not finished resolves it with
/// [`TransportError::Aborted`]. Aborting a finished call has no effect.
#[derive(Clone, Default)]
pub struct AbortHandle {
    notify: Arc<Notify>,
}

impl AbortHandle {
    /// Create a new handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the call.
    pub fn abort(&self) {
        self.notify.notify_one();
    }

    async fn aborted(&self) {
        self.notify.notified().await
    }
}

impl Debug for AbortHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortHandle").finish_non_exhaustive()
    }
}

/// Dispatcher sends signed requests and turns their outcome into a
/// response shape.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ctx: Context,
}

impl Dispatcher {
    /// Create a dispatcher sending through the context's [`vws_core::HttpSend`].
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Send `req` and resolve to its response.
    ///
    /// The HTTP status is not consulted, the service reports failures in
    /// `result_code`. Transport failures resolve to a response that only
    /// carries the synthetic code of their class.
    pub async fn dispatch<T: ServiceResponse>(
        &self,
        req: http::Request<Bytes>,
        abort: &AbortHandle,
    ) -> T {
        let mut exchange = Exchange::new(&req);
        exchange.transit(RequestState::Sent);

        let result = tokio::select! {
            biased;
            _ = abort.aborted() => Err(Error::aborted("request aborted by caller")),
            resp = self.ctx.http_send(req) => resp,
        };

        match result {
            Ok(resp) => {
                exchange.transit(RequestState::Finished);
                parse(resp.body())
            }
            Err(err) => {
                let state = RequestState::from(err.kind());
                exchange.transit(state);

                let code = TransportError::from(err.kind());
                match state {
                    RequestState::ConnectionTimedOut | RequestState::TimedOut => {
                        error!("{}: {code}: {err:?}", exchange.target)
                    }
                    _ => warn!("{}: {code}: {err:?}", exchange.target),
                }
                T::from_transport_error(code)
            }
        }
    }
}

/// Call is the pending outcome of one operation.
///
/// Await it to get the response, or hand it a completion handler with
/// [`Call::on_complete`]. Either way the outcome is delivered exactly once.
///
/// The call resolves to an error only if the request could not be signed.
pub struct Call<T> {
    fut: Pin<Box<dyn Future<Output = Result<T>> + Send>>,
    abort: AbortHandle,
}

impl<T: Send + 'static> Call<T> {
    pub(crate) fn new(
        fut: impl Future<Output = Result<T>> + Send + 'static,
        abort: AbortHandle,
    ) -> Self {
        Self {
            fut: Box::pin(fut),
            abort,
        }
    }

    /// Handle that aborts this call.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run the call on the tokio runtime and invoke `handler` once with
    /// its outcome.
    pub fn on_complete<F>(self, handler: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        tokio::spawn(async move { handler(self.await) })
    }
}

impl<T> Future for Call<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        self.fut.as_mut().poll(cx)
    }
}

impl<T> Debug for Call<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("abort", &self.abort)
            .finish_non_exhaustive()
    }
}
