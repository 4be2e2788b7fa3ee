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

//! Outbound requests of the target management API.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Method;
use percent_encoding::utf8_percent_encode;
use serde::Serialize;
use vws_core::{Error, Result};

use crate::constants::*;
use crate::target::{TargetPayload, TargetUpdate};

/// One request of the target management API before signing.
///
/// The body is kept as [`Bytes`] so that the exact bytes that are hashed
/// for the signature are the bytes that are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    method: Method,
    path: String,
    body: Bytes,
}

impl Operation {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            body: Bytes::new(),
        }
    }

    fn with_json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Bytes::from(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// `POST /targets` with the full payload.
    pub fn create_target(payload: &TargetPayload) -> Result<Self> {
        check_width(payload.width)?;
        Self::new(Method::POST, "/targets".to_string()).with_json(payload)
    }

    /// `GET /targets/{id}`.
    pub fn retrieve_target(target_id: &str) -> Result<Self> {
        Ok(Self::new(Method::GET, target_path("targets", target_id)?))
    }

    /// `GET /targets`.
    pub fn retrieve_target_list() -> Self {
        Self::new(Method::GET, "/targets".to_string())
    }

    /// `GET /duplicates/{id}`.
    pub fn retrieve_duplicates(target_id: &str) -> Result<Self> {
        Ok(Self::new(Method::GET, target_path("duplicates", target_id)?))
    }

    /// `PUT /targets/{id}` with the full payload.
    pub fn update_target(target_id: &str, payload: &TargetPayload) -> Result<Self> {
        check_width(payload.width)?;
        Self::new(Method::PUT, target_path("targets", target_id)?).with_json(payload)
    }

    /// `PUT /targets/{id}` with a single field.
    pub fn update_target_field(target_id: &str, update: &TargetUpdate) -> Result<Self> {
        if let TargetUpdate::Width(width) = update {
            check_width(*width)?;
        }
        Self::new(Method::PUT, target_path("targets", target_id)?).with_json(update)
    }

    /// `PUT /targets/{id}` with `{"name": ...}`.
    pub fn update_target_name(target_id: &str, name: &str) -> Result<Self> {
        Self::update_target_field(target_id, &TargetUpdate::Name(name.to_string()))
    }

    /// `PUT /targets/{id}` with `{"width": ...}`.
    pub fn update_target_width(target_id: &str, width: f32) -> Result<Self> {
        Self::update_target_field(target_id, &TargetUpdate::Width(width))
    }

    /// `PUT /targets/{id}` with `{"image": ...}`, the JPEG bytes are base64 encoded.
    pub fn update_target_image(target_id: &str, jpeg: &[u8]) -> Result<Self> {
        Self::update_target_field(target_id, &TargetUpdate::image(jpeg))
    }

    /// `PUT /targets/{id}` with `{"active_flag": ...}`.
    pub fn update_target_active_flag(target_id: &str, active_flag: bool) -> Result<Self> {
        Self::update_target_field(target_id, &TargetUpdate::ActiveFlag(active_flag))
    }

    /// `PUT /targets/{id}` with `{"application_metadata": ...}`, the text is base64 encoded.
    pub fn update_target_metadata(target_id: &str, metadata: &str) -> Result<Self> {
        Self::update_target_field(target_id, &TargetUpdate::application_metadata(metadata))
    }

    /// `DELETE /targets/{id}`.
    pub fn delete_target(target_id: &str) -> Result<Self> {
        Ok(Self::new(Method::DELETE, target_path("targets", target_id)?))
    }

    /// `GET /summary/{id}`.
    pub fn retrieve_target_summary(target_id: &str) -> Result<Self> {
        Ok(Self::new(Method::GET, target_path("summary", target_id)?))
    }

    /// `GET /summary`.
    pub fn retrieve_database_summary() -> Self {
        Self::new(Method::GET, "/summary".to_string())
    }

    /// HTTP method of this operation.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, also the path that is signed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request body, empty for bodiless operations.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Build the unsigned http request against `endpoint`.
    pub fn into_request(self, endpoint: &str) -> Result<http::Request<Bytes>> {
        let uri = format!("{}{}", endpoint.trim_end_matches('/'), self.path);

        let req = http::Request::builder()
            .method(self.method)
            .uri(uri)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(self.body)?;
        Ok(req)
    }
}

fn target_path(collection: &str, target_id: &str) -> Result<String> {
    if target_id.is_empty() {
        return Err(Error::request_invalid("target id must not be empty"));
    }

    let id = utf8_percent_encode(target_id, &PATH_SEGMENT_ENCODE_SET);
    Ok(format!("/{collection}/{id}"))
}

fn check_width(width: f32) -> Result<()> {
    if !width.is_finite() {
        return Err(Error::request_invalid(format!(
            "target width must be a finite number, got {width}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use vws_core::ErrorKind;

    fn payload() -> TargetPayload {
        TargetPayload::new("box", 1.0, b"jpeg", true, "meta")
    }

    #[test_case(Operation::create_target(&payload()).unwrap(), Method::POST, "/targets"; "create target")]
    #[test_case(Operation::retrieve_target("T1").unwrap(), Method::GET, "/targets/T1"; "retrieve target")]
    #[test_case(Operation::retrieve_target_list(), Method::GET, "/targets"; "retrieve target list")]
    #[test_case(Operation::retrieve_duplicates("T1").unwrap(), Method::GET, "/duplicates/T1"; "retrieve duplicates")]
    #[test_case(Operation::update_target("T1", &payload()).unwrap(), Method::PUT, "/targets/T1"; "update target")]
    #[test_case(Operation::update_target_name("T1", "box").unwrap(), Method::PUT, "/targets/T1"; "update name")]
    #[test_case(Operation::update_target_width("T1", 2.0).unwrap(), Method::PUT, "/targets/T1"; "update width")]
    #[test_case(Operation::update_target_image("T1", b"jpeg").unwrap(), Method::PUT, "/targets/T1"; "update image")]
    #[test_case(Operation::update_target_active_flag("T1", false).unwrap(), Method::PUT, "/targets/T1"; "update active flag")]
    #[test_case(Operation::update_target_metadata("T1", "meta").unwrap(), Method::PUT, "/targets/T1"; "update metadata")]
    #[test_case(Operation::delete_target("T1").unwrap(), Method::DELETE, "/targets/T1"; "delete target")]
    #[test_case(Operation::retrieve_target_summary("T1").unwrap(), Method::GET, "/summary/T1"; "retrieve target summary")]
    #[test_case(Operation::retrieve_database_summary(), Method::GET, "/summary"; "retrieve database summary")]
    fn test_method_and_path(op: Operation, method: Method, path: &str) {
        assert_eq!(op.method(), &method);
        assert_eq!(op.path(), path);

        let has_body = method == Method::POST || method == Method::PUT;
        assert_eq!(!op.body().is_empty(), has_body);
    }

    #[test]
    fn test_full_body_has_five_fields() {
        let op = Operation::update_target("T1", &payload()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(op.body()).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 5);
        assert_eq!(obj["name"], "box");
        assert_eq!(obj["image"], "anBlZw==");
        assert_eq!(obj["application_metadata"], "bWV0YQ==");
    }

    #[test]
    fn test_partial_bodies_have_one_key() {
        let ops = [
            (Operation::update_target_name("T1", "box").unwrap(), "name"),
            (Operation::update_target_width("T1", 2.0).unwrap(), "width"),
            (Operation::update_target_image("T1", b"jpeg").unwrap(), "image"),
            (Operation::update_target_active_flag("T1", false).unwrap(), "active_flag"),
            (Operation::update_target_metadata("T1", "meta").unwrap(), "application_metadata"),
        ];

        for (op, key) in ops {
            let value: serde_json::Value = serde_json::from_slice(op.body()).unwrap();
            let obj = value.as_object().unwrap();
            assert_eq!(obj.len(), 1, "{key}");
            assert!(obj.contains_key(key), "{key}");
        }
    }

    #[test]
    fn test_partial_body_is_compact() {
        let op = Operation::update_target_name("T1", "box").unwrap();
        assert_eq!(op.body().as_ref(), br#"{"name":"box"}"#);
    }

    #[test]
    fn test_empty_target_id_is_rejected() {
        let results = [
            Operation::retrieve_target(""),
            Operation::retrieve_duplicates(""),
            Operation::update_target("", &payload()),
            Operation::update_target_name("", "box"),
            Operation::update_target_width("", 1.0),
            Operation::update_target_image("", b"jpeg"),
            Operation::update_target_active_flag("", true),
            Operation::update_target_metadata("", "meta"),
            Operation::delete_target(""),
            Operation::retrieve_target_summary(""),
        ];

        for result in results {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        }
    }

    #[test]
    fn test_non_finite_width_is_rejected() {
        let err = Operation::update_target_width("T1", f32::NAN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);

        let mut payload = payload();
        payload.width = f32::INFINITY;
        assert!(Operation::create_target(&payload).is_err());
    }

    #[test]
    fn test_target_id_is_percent_encoded() {
        let op = Operation::retrieve_target("a b/c").unwrap();
        assert_eq!(op.path(), "/targets/a%20b%2Fc");
    }

    #[test]
    fn test_into_request() {
        let req = Operation::update_target_name("T1", "box")
            .unwrap()
            .into_request("https://vws.vuforia.com/")
            .unwrap();

        assert_eq!(req.method(), &Method::PUT);
        assert_eq!(req.uri().to_string(), "https://vws.vuforia.com/targets/T1");
        assert_eq!(req.uri().path(), "/targets/T1");
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(req.body().as_ref(), br#"{"name":"box"}"#);
    }
}
