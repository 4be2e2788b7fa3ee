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

//! Typed responses of the target management API.

use std::fmt::{Display, Formatter};

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use vws_core::ErrorKind;

/// Failure class of a call that never produced a usable response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportError {
    /// The request finished with a connection error.
    RequestFailed,
    /// The request was aborted by the caller.
    Aborted,
    /// The connection could not be established in time.
    ConnectionTimedOut,
    /// The connection was established but the exchange did not complete in time.
    TimedOut,
    /// The response body was not valid JSON or carried no `result_code`.
    InvalidResponse,
}

impl TransportError {
    const ALL: [TransportError; 5] = [
        TransportError::RequestFailed,
        TransportError::Aborted,
        TransportError::ConnectionTimedOut,
        TransportError::TimedOut,
        TransportError::InvalidResponse,
    ];

    /// The synthetic `result_code` reported for this failure.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportError::RequestFailed => "Request Finished with Error",
            TransportError::Aborted => "Request Aborted",
            TransportError::ConnectionTimedOut => "Connection Timed Out",
            TransportError::TimedOut => "Processing the request Timed Out",
            TransportError::InvalidResponse => "Response Could Not Be Parsed",
        }
    }

    /// Look up the failure whose synthetic code is `code`.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == code)
    }
}

impl From<ErrorKind> for TransportError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Aborted => TransportError::Aborted,
            ErrorKind::ConnectTimeout => TransportError::ConnectionTimedOut,
            ErrorKind::Timeout => TransportError::TimedOut,
            _ => TransportError::RequestFailed,
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `result_code` of a response.
///
/// The wire string is always preserved, see [`ResultCode::as_str`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ResultCode {
    /// `Success`
    Success,
    /// `TargetCreated`, the success code of target creation.
    TargetCreated,
    /// Synthetic code of a call that failed before a body was available.
    Transport(TransportError),
    /// Any other code reported by the service, such as `UnknownTarget` or
    /// `AuthenticationFailure`.
    Application(String),
}

impl ResultCode {
    /// The code as sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            ResultCode::Success => "Success",
            ResultCode::TargetCreated => "TargetCreated",
            ResultCode::Transport(err) => err.as_str(),
            ResultCode::Application(code) => code,
        }
    }

    /// Check if the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success | ResultCode::TargetCreated)
    }

    /// Check if the call failed in the transport layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, ResultCode::Transport(_))
    }
}

impl From<String> for ResultCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "Success" => ResultCode::Success,
            "TargetCreated" => ResultCode::TargetCreated,
            s => match TransportError::from_code(s) {
                Some(err) => ResultCode::Transport(err),
                None => ResultCode::Application(code),
            },
        }
    }
}

impl From<&str> for ResultCode {
    fn from(code: &str) -> Self {
        ResultCode::from(code.to_string())
    }
}

impl From<ResultCode> for String {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::Application(code) => code,
            code => code.as_str().to_string(),
        }
    }
}

impl From<TransportError> for ResultCode {
    fn from(err: TransportError) -> Self {
        ResultCode::Transport(err)
    }
}

impl Display for ResultCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ServiceResponse is implemented by every response shape.
pub trait ServiceResponse: DeserializeOwned + Send + 'static {
    /// Build the response of a call that failed with `err`.
    fn from_transport_error(err: TransportError) -> Self;

    /// The `result_code` of this response.
    fn result_code(&self) -> &ResultCode;

    /// Check if the call succeeded.
    fn is_success(&self) -> bool {
        self.result_code().is_success()
    }
}

/// Generic response of target operations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetResponse {
    pub result_code: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Id of the created target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_record: Option<TargetRecord>,
    /// Ids of targets similar to the requested one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similar_targets: Option<Vec<String>>,
    /// Ids of all targets of the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<String>>,
    /// Processing status of the target, such as `processing` or `success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A target as stored by the service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub target_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub width: f32,
    /// `-1` while the target is not processed, `0` to `5` afterwards.
    #[serde(deserialize_with = "null_as_not_processed")]
    pub tracking_rating: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub active_flag: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub reco_rating: String,
}

/// Deserialize `null` as the default value of the field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_not_processed<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or(-1))
}

impl Default for TargetRecord {
    fn default() -> Self {
        Self {
            target_id: String::new(),
            name: String::new(),
            width: 0.0,
            tracking_rating: -1,
            active_flag: false,
            reco_rating: String::new(),
        }
    }
}

/// Summary of a single target.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetSummary {
    pub result_code: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_flag: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reco_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_recos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_month_recos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_month_recos: Option<u64>,
}

/// Summary of the whole cloud database.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseSummary {
    pub result_code: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Name of the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_images: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_images: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_images: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_recos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_month_recos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_month_recos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_usage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reco_threshold: Option<u64>,
}

macro_rules! impl_service_response {
    ($($ty:ident { $($field:ident),* $(,)? })*) => {
        $(
            impl $ty {
                /// Build a response that only carries `result_code`.
                pub fn with_result_code(result_code: impl Into<ResultCode>) -> Self {
                    Self {
                        result_code: result_code.into(),
                        $($field: None,)*
                    }
                }
            }

            impl ServiceResponse for $ty {
                fn from_transport_error(err: TransportError) -> Self {
                    Self::with_result_code(err)
                }

                fn result_code(&self) -> &ResultCode {
                    &self.result_code
                }
            }
        )*
    };
}

impl_service_response! {
    TargetResponse {
        transaction_id,
        target_id,
        target_record,
        similar_targets,
        results,
        status,
    }
    TargetSummary {
        transaction_id,
        database_name,
        target_name,
        upload_date,
        active_flag,
        status,
        tracking_rating,
        reco_rating,
        total_recos,
        current_month_recos,
        previous_month_recos,
    }
    DatabaseSummary {
        transaction_id,
        name,
        active_images,
        inactive_images,
        failed_images,
        target_quota,
        total_recos,
        current_month_recos,
        previous_month_recos,
        request_quota,
        request_usage,
        reco_threshold,
    }
}

/// Parse a response body.
///
/// Missing and unknown fields are tolerated, a body that is not a JSON
/// object with a `result_code` yields [`TransportError::InvalidResponse`].
pub fn parse<T: ServiceResponse>(body: &[u8]) -> T {
    match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(err) => {
            warn!("response body could not be parsed: {err}");
            T::from_transport_error(TransportError::InvalidResponse)
        }
    }
}
