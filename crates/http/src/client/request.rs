//! Replayable request descriptions
//!
//! A [`reqwest::RequestBuilder`] is consumed when sent and a multipart form
//! streams its parts, so neither can be dispatched twice. The gateway keeps a
//! [`PendingRequest`] instead and rebuilds the outbound request for each
//! attempt.

use autobid_core::{ImageUpload, ListingForm, ListingSubmission};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Url};
use serde::Serialize;

use super::error::ClientError;

/// Body of a pending request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartPayload),
}

/// Owned multipart fields and files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartPayload {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

/// A file part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MultipartPayload {
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, image: &ImageUpload) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file_name: image.file_name.clone(),
            content_type: image.content_type.clone(),
            bytes: image.bytes.clone(),
        });
        self
    }

    /// Encode a listing form the way the backend binds it
    pub fn from_listing(form: &ListingForm, submission: ListingSubmission) -> Self {
        let payload = form
            .text_fields(submission)
            .into_iter()
            .fold(Self::default(), |payload, (name, value)| {
                payload.text(name, value)
            });
        form.images.iter().fold(payload, |payload, image| {
            payload.file(submission.image_field(), image)
        })
    }

    /// Build a fresh streaming form for one dispatch
    pub fn to_form(&self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let part = Part::bytes(file.bytes.to_vec())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| {
                    ClientError::Validation(format!(
                        "{}: invalid content type {}: {e}",
                        file.file_name, file.content_type
                    ))
                })?;
            form = form.part(file.name.clone(), part);
        }
        Ok(form)
    }
}

/// One logical outbound call, kept until it completes
///
/// `path` is a fixed route; caller-supplied ids go in `segments`, which are
/// percent-encoded when the URL is built so an id can never change the route.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub method: Method,
    pub path: String,
    pub segments: Vec<String>,
    pub body: RequestBody,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one path segment, encoded on dispatch
    #[must_use]
    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    /// Route and raw segments, for logs
    pub fn target(&self) -> String {
        self.segments
            .iter()
            .fold(self.path.clone(), |target, segment| format!("{target}/{segment}"))
    }

    /// Full URL under `base_url`
    pub(crate) fn url(&self, base_url: &str) -> Result<Url, ClientError> {
        let raw = format!("{base_url}{}", self.path);
        let mut url = Url::parse(&raw)
            .map_err(|e| ClientError::Configuration(format!("invalid request URL {raw}: {e}")))?;
        if !self.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|()| ClientError::Configuration(format!("{raw} cannot take a path")))?
                .pop_if_empty()
                .extend(&self.segments);
        }
        Ok(url)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart body
    #[must_use]
    pub fn multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }

    /// Apply the body to a request builder
    pub(crate) fn apply_body(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        Ok(match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(payload) => builder.multipart(payload.to_form()?),
        })
    }
}
