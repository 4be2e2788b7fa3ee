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

use serde::Serialize;
use vws_core::hash::base64_encode;

/// Outbound body of create and full update requests.
///
/// `image` and `application_metadata` are already base64 encoded, use
/// [`TargetPayload::new`] to build one from raw bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetPayload {
    /// Name of the target, unique within a database.
    pub name: String,
    /// Width of the target in scene units.
    pub width: f32,
    /// Base64 encoded JPEG image.
    pub image: String,
    /// Whether the target is active for recognition.
    pub active_flag: bool,
    /// Base64 encoded metadata returned on recognition.
    pub application_metadata: String,
}

impl TargetPayload {
    /// Build a payload from a JPEG image and a metadata text.
    pub fn new(
        name: impl Into<String>,
        width: f32,
        jpeg: &[u8],
        active_flag: bool,
        metadata: &str,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            image: base64_encode(jpeg),
            active_flag,
            application_metadata: base64_encode(metadata.as_bytes()),
        }
    }
}

/// Body of a partial update: exactly one field of a target.
///
/// Serializes to a single key object such as `{"active_flag":false}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetUpdate {
    /// New name.
    Name(String),
    /// New width.
    Width(f32),
    /// New base64 encoded JPEG image.
    Image(String),
    /// New active flag.
    ActiveFlag(bool),
    /// New base64 encoded metadata.
    ApplicationMetadata(String),
}

impl TargetUpdate {
    /// Replace the image with the given JPEG bytes.
    pub fn image(jpeg: &[u8]) -> Self {
        Self::Image(base64_encode(jpeg))
    }

    /// Replace the metadata with the given text.
    pub fn application_metadata(metadata: &str) -> Self {
        Self::ApplicationMetadata(base64_encode(metadata.as_bytes()))
    }
}
