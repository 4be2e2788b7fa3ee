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

//! VWS request signer.

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::header::CONTENT_TYPE;
use http::header::DATE;
use http::HeaderValue;
use log::debug;
use vws_core::hash::{base64_hmac_sha1, hex_md5};
use vws_core::time::{format_http_date, now, DateTime};
use vws_core::utils::redact_authorization;
use vws_core::{Context, Error, Result, SignRequest};

use crate::constants::*;
use crate::credential::Credential;

/// RequestSigner that implements the VWS authorization scheme.
///
/// The signature is computed over:
///
/// ```text
/// HTTP-Verb + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// Request-Path
/// ```
///
/// and sent as `Authorization: VWS {access_key}:{signature}` together with
/// the `Date` that was signed.
#[derive(Debug, Default)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait::async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _ctx: &Context,
        req: &mut http::Request<Bytes>,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let cred = credential.ok_or_else(|| Error::credential_invalid("missing credential"))?;
        let date = format_http_date(self.time.unwrap_or_else(now));

        if !req.headers().contains_key(CONTENT_TYPE) {
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        }
        let content_type = req.headers()[CONTENT_TYPE].to_str()?.to_string();

        let content_md5 = hex_md5(req.body());
        let signature = sign(
            &cred.secret_key,
            req.method().as_str(),
            &content_md5,
            &content_type,
            &date,
            req.uri().path(),
        );

        let authorization = authorization(&cred.access_key, &signature);
        debug!(
            "signed {} {} as {}",
            req.method(),
            req.uri().path(),
            redact_authorization(&authorization)
        );

        req.headers_mut().insert(DATE, date.parse()?);
        req.headers_mut().insert(AUTHORIZATION, {
            let mut value: HeaderValue = authorization.parse()?;
            value.set_sensitive(true);

            value
        });

        Ok(())
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// METHOD + "\n" +
/// CONTENT_MD5 + "\n" +
/// CONTENT_TYPE + "\n" +
/// DATE + "\n" +
/// PATH
/// ```
///
/// There is no trailing newline.
pub fn string_to_sign(
    method: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    path: &str,
) -> String {
    let s = [method, content_md5, content_type, date, path].join("\n");

    debug!("string to sign: {:?}", &s);
    s
}

/// Compute the base64 encoded HMAC-SHA1 signature of a request.
///
/// `content_md5` must be the lowercase hex MD5 of the exact body that is
/// sent, see [`vws_core::hash::hex_md5`].
pub fn sign(
    secret_key: &str,
    method: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    path: &str,
) -> String {
    let s = string_to_sign(method, content_md5, content_type, date, path);
    base64_hmac_sha1(secret_key.as_bytes(), s.as_bytes())
}

/// Build the `Authorization` header value.
pub fn authorization(access_key: &str, signature: &str) -> String {
    format!("{AUTH_SCHEME} {access_key}:{signature}")
}
