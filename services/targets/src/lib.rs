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

//! Signed client for the cloud image target management API.
//!
//! This crate signs requests with the `VWS` authorization scheme and sends
//! them through a [`vws_core::HttpSend`], resolving every call to a typed
//! response.
//!
//! ## Overview
//!
//! Each request is signed with HMAC-SHA1 over the method, the MD5 of the
//! body, the content type, the date and the path. The service reports every
//! outcome in the `result_code` of the body, which is exposed as
//! [`ResultCode`]. Calls that fail before a body is available resolve to a
//! response carrying the synthetic code of their [`TransportError`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use vws_core::{Context, OsEnv, Result};
//! use vws_http_send_reqwest::ReqwestHttpSend;
//! use vws_targets::{Client, Config, ServiceResponse, TargetPayload};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     let config = Config::new()
//!         .with_access_key("server-access-key")
//!         .with_secret_key("server-secret-key");
//!     let client = Client::from_config(ctx, config);
//!
//!     let jpeg = std::fs::read("box.jpg")?;
//!     let payload = TargetPayload::new("box", 0.1, &jpeg, true, "a box");
//!     let resp = client.create_target(&payload)?.await?;
//!     if resp.is_success() {
//!         println!("created {:?}", resp.target_id);
//!     } else {
//!         println!("failed: {}", resp.result_code);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Credential Sources
//!
//! ### Environment Variables
//!
//! ```bash
//! export VWS_ACCESS_KEY=your-server-access-key
//! export VWS_SECRET_KEY=your-server-secret-key
//! export VWS_ENDPOINT=https://vws.vuforia.com  # Optional
//! ```
//!
//! ## Completion Handlers
//!
//! ```no_run
//! # use vws_targets::Client;
//! # fn example(client: &Client) -> vws_core::Result<()> {
//! let call = client.retrieve_target("T1")?;
//! let abort = call.abort_handle();
//! call.on_complete(|resp| match resp {
//!     Ok(resp) => println!("{}", resp.result_code),
//!     Err(err) => println!("not signed: {err}"),
//! });
//! abort.abort();
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::*;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::{authorization, sign, string_to_sign, RequestSigner};

mod provide_credential;
pub use provide_credential::*;

mod target;
pub use target::{TargetPayload, TargetUpdate};

mod operation;
pub use operation::Operation;

mod response;
pub use response::{
    parse, DatabaseSummary, ResultCode, ServiceResponse, TargetRecord, TargetResponse,
    TargetSummary, TransportError,
};

mod dispatch;
pub use dispatch::{AbortHandle, Call, Dispatcher, RequestState};

mod client;
pub use client::Client;
