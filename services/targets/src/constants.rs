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

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Env values used in vws services.
pub const VWS_ACCESS_KEY: &str = "VWS_ACCESS_KEY";
pub const VWS_SECRET_KEY: &str = "VWS_SECRET_KEY";
pub const VWS_ENDPOINT: &str = "VWS_ENDPOINT";

/// Base origin of the target management API.
pub const DEFAULT_ENDPOINT: &str = "https://vws.vuforia.com";

/// Scheme token of the `Authorization` header.
pub const AUTH_SCHEME: &str = "VWS";

/// The only content type the service accepts, also used for bodiless requests.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Characters left as-is when a target id is placed in a path segment.
///
/// Everything except RFC 3986 unreserved characters is escaped.
pub static PATH_SEGMENT_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
