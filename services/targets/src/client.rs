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

use std::sync::Arc;

use vws_core::{Context, Result, Signer};

use crate::config::Config;
use crate::constants::DEFAULT_ENDPOINT;
use crate::credential::Credential;
use crate::dispatch::{AbortHandle, Call, Dispatcher};
use crate::operation::Operation;
use crate::provide_credential::ConfigCredentialProvider;
use crate::response::{DatabaseSummary, ServiceResponse, TargetResponse, TargetSummary};
use crate::sign_request::RequestSigner;
use crate::target::TargetPayload;

/// Client of the target management API.
///
/// Every operation validates its input, builds its request synchronously
/// and returns a [`Call`]. The request is signed and sent once the call is
/// awaited or handed to [`Call::on_complete`]. Calls are independent of
/// each other and may complete in any order.
///
/// # Example
///
/// ```no_run
/// use vws_core::{Context, OsEnv};
/// use vws_http_send_reqwest::ReqwestHttpSend;
/// use vws_targets::{Client, Config};
///
/// # async fn example() -> vws_core::Result<()> {
/// let ctx = Context::new()
///     .with_http_send(ReqwestHttpSend::default())
///     .with_env(OsEnv);
/// let client = Client::from_config(ctx, Config::new());
///
/// let summary = client.retrieve_database_summary()?.await?;
/// println!("{}: {:?} active", summary.result_code, summary.active_images);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    signer: Signer<Credential>,
    dispatcher: Dispatcher,
    endpoint: String,
}

impl Client {
    /// Create a client sending through the signer's context to the
    /// default endpoint.
    pub fn new(signer: Signer<Credential>) -> Self {
        Self {
            dispatcher: Dispatcher::new(signer.context().clone()),
            signer,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Create a client whose credential and endpoint come from `config`,
    /// falling back to the context's environment.
    pub fn from_config(ctx: Context, config: Config) -> Self {
        let config = config.from_env(&ctx);
        let endpoint = config.endpoint().to_string();

        let loader = ConfigCredentialProvider::new(Arc::new(config));
        let signer = Signer::new(ctx, loader, RequestSigner::new());
        Self::new(signer).with_endpoint(endpoint)
    }

    /// Set the endpoint requests are sent to.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Replace the credential.
    ///
    /// A call is signed when it is first polled. Calls that are already
    /// signed keep their signature, calls created earlier but not yet
    /// awaited or spawned are signed with the new credential.
    pub fn set_credential(&self, credential: Credential) {
        self.signer.set_credential(credential)
    }

    fn call<T: ServiceResponse>(&self, op: Operation) -> Result<Call<T>> {
        let mut req = op.into_request(&self.endpoint)?;

        let signer = self.signer.clone();
        let dispatcher = self.dispatcher.clone();
        let abort = AbortHandle::new();
        let handle = abort.clone();
        let fut = async move {
            signer.sign(&mut req).await?;
            Ok(dispatcher.dispatch(req, &handle).await)
        };

        Ok(Call::new(fut, abort))
    }

    /// Create a target. Succeeds with `TargetCreated` and the new `target_id`.
    pub fn create_target(&self, payload: &TargetPayload) -> Result<Call<TargetResponse>> {
        self.call(Operation::create_target(payload)?)
    }

    /// Retrieve a target and its `target_record`.
    pub fn retrieve_target(&self, target_id: &str) -> Result<Call<TargetResponse>> {
        self.call(Operation::retrieve_target(target_id)?)
    }

    /// Retrieve the ids of all targets in `results`.
    pub fn retrieve_target_list(&self) -> Result<Call<TargetResponse>> {
        self.call(Operation::retrieve_target_list())
    }

    /// Retrieve the ids of targets similar to a target in `similar_targets`.
    pub fn retrieve_duplicates(&self, target_id: &str) -> Result<Call<TargetResponse>> {
        self.call(Operation::retrieve_duplicates(target_id)?)
    }

    /// Replace every field of a target.
    pub fn update_target(
        &self,
        target_id: &str,
        payload: &TargetPayload,
    ) -> Result<Call<TargetResponse>> {
        self.call(Operation::update_target(target_id, payload)?)
    }

    /// Rename a target.
    pub fn update_target_name(&self, target_id: &str, name: &str) -> Result<Call<TargetResponse>> {
        self.call(Operation::update_target_name(target_id, name)?)
    }

    /// Change the width of a target.
    pub fn update_target_width(&self, target_id: &str, width: f32) -> Result<Call<TargetResponse>> {
        self.call(Operation::update_target_width(target_id, width)?)
    }

    /// Replace the image of a target with JPEG bytes.
    pub fn update_target_image(
        &self,
        target_id: &str,
        jpeg: &[u8],
    ) -> Result<Call<TargetResponse>> {
        self.call(Operation::update_target_image(target_id, jpeg)?)
    }

    /// Activate or deactivate a target.
    pub fn update_target_active_flag(
        &self,
        target_id: &str,
        active_flag: bool,
    ) -> Result<Call<TargetResponse>> {
        self.call(Operation::update_target_active_flag(target_id, active_flag)?)
    }

    /// Replace the metadata of a target.
    pub fn update_target_metadata(
        &self,
        target_id: &str,
        metadata: &str,
    ) -> Result<Call<TargetResponse>> {
        self.call(Operation::update_target_metadata(target_id, metadata)?)
    }

    /// Delete a target.
    pub fn delete_target(&self, target_id: &str) -> Result<Call<TargetResponse>> {
        self.call(Operation::delete_target(target_id)?)
    }

    /// Retrieve the summary of a target.
    pub fn retrieve_target_summary(&self, target_id: &str) -> Result<Call<TargetSummary>> {
        self.call(Operation::retrieve_target_summary(target_id)?)
    }

    /// Retrieve the summary of the database.
    pub fn retrieve_database_summary(&self) -> Result<Call<DatabaseSummary>> {
        self.call(Operation::retrieve_database_summary())
    }
}
