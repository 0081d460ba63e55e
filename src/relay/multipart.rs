//! multipart/form-data assembly.
//!
//! # Responsibilities
//! - Generate a fresh boundary per payload
//! - Serialize an ordered list of typed parts with RFC 2046 framing
//! - Lay out the try-on form in the slot order the upstream expects
//!
//! # Design Decisions
//! - Pure and network-free: bytes in, bytes out
//! - Part bodies are opaque and never escaped; instead the boundary is
//!   checked against every body and regenerated on collision
//! - CRLF line endings everywhere

use axum::body::Bytes;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

use crate::relay::types::{FetchedImages, Garment};

/// Fixed prefix of every generated boundary.
pub const BOUNDARY_PREFIX: &str = "----TryOnFormBoundary";

const BOUNDARY_RANDOM_LEN: usize = 24;
const MAX_BOUNDARY_ATTEMPTS: usize = 4;
const CRLF: &[u8] = b"\r\n";

/// Content type declared for every image part.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// A multipart boundary token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Generate a random boundary.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BOUNDARY_RANDOM_LEN)
            .map(char::from)
            .collect();
        Self(format!("{BOUNDARY_PREFIX}{suffix}"))
    }

    /// Use a caller-chosen token. Mostly useful for deterministic tests.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The delimiter line prefix, `--<token>`.
    fn delimiter(&self) -> Vec<u8> {
        format!("--{}", self.0).into_bytes()
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("boundary '{0}' occurs inside a part body")]
    BoundaryCollision(String),

    #[error("could not find a collision-free boundary after {0} attempts")]
    NoUsableBoundary(usize),
}

#[derive(Debug, Clone)]
enum PartBody {
    Binary {
        filename: String,
        content_type: String,
        data: Bytes,
    },
    Text(String),
}

impl PartBody {
    fn bytes(&self) -> &[u8] {
        match self {
            PartBody::Binary { data, .. } => data.as_ref(),
            PartBody::Text(text) => text.as_bytes(),
        }
    }
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    body: PartBody,
}

/// Ordered collection of form parts awaiting serialization.
#[derive(Debug, Clone, Default)]
pub struct MultipartBuilder {
    parts: Vec<Part>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file part.
    pub fn binary(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            body: PartBody::Binary {
                filename: filename.into(),
                content_type: content_type.into(),
                data,
            },
        });
        self
    }

    /// Append a plain text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            body: PartBody::Text(value.into()),
        });
        self
    }

    /// Field names in serialization order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Serialize with a freshly generated boundary, regenerating it if it
    /// happens to occur inside any part body.
    pub fn build(&self) -> Result<MultipartBody, MultipartError> {
        for _ in 0..MAX_BOUNDARY_ATTEMPTS {
            match self.build_with(Boundary::generate()) {
                Ok(body) => return Ok(body),
                Err(MultipartError::BoundaryCollision(boundary)) => {
                    tracing::debug!(%boundary, "Boundary collided with part content, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(MultipartError::NoUsableBoundary(MAX_BOUNDARY_ATTEMPTS))
    }

    /// Serialize with the given boundary.
    pub fn build_with(&self, boundary: Boundary) -> Result<MultipartBody, MultipartError> {
        let delimiter = boundary.delimiter();
        if self
            .parts
            .iter()
            .any(|part| contains(part.body.bytes(), &delimiter))
        {
            return Err(MultipartError::BoundaryCollision(boundary.0));
        }

        let capacity = self
            .parts
            .iter()
            .map(|p| p.body.bytes().len() + 160)
            .sum::<usize>()
            + delimiter.len()
            + 4;
        let mut out = Vec::with_capacity(capacity);

        for part in &self.parts {
            out.extend_from_slice(&delimiter);
            out.extend_from_slice(CRLF);
            match &part.body {
                PartBody::Binary {
                    filename,
                    content_type,
                    data,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape_quoted(&part.name),
                            escape_quoted(filename)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(data);
                }
                PartBody::Text(text) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n",
                            escape_quoted(&part.name)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(CRLF);
                    out.extend_from_slice(text.as_bytes());
                }
            }
            out.extend_from_slice(CRLF);
        }

        out.extend_from_slice(&delimiter);
        out.extend_from_slice(b"--");
        out.extend_from_slice(CRLF);

        Ok(MultipartBody {
            boundary,
            bytes: Bytes::from(out),
            part_count: self.parts.len(),
        })
    }
}

/// A fully framed multipart payload and the boundary it was framed with.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: Boundary,
    bytes: Bytes,
    part_count: usize,
}

impl MultipartBody {
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Value for the `Content-Type` request header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn part_count(&self) -> usize {
        self.part_count
    }
}

/// Lay out the try-on form: `model_image`, then `cloth_image_{i}` and
/// `cloth_type_{i}` for each garment, 1-indexed in request order.
pub fn tryon_form(images: FetchedImages, garments: &[Garment]) -> MultipartBuilder {
    let mut builder =
        MultipartBuilder::new().binary("model_image", "model.jpg", IMAGE_CONTENT_TYPE, images.model);

    for (i, (data, garment)) in images.garments.into_iter().zip(garments).enumerate() {
        let idx = i + 1;
        builder = builder
            .binary(
                format!("cloth_image_{idx}"),
                format!("cloth{idx}.jpg"),
                IMAGE_CONTENT_TYPE,
                data,
            )
            .text(format!("cloth_type_{idx}"), garment.cloth_type.as_str());
    }

    builder
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Percent-encode the characters that would break a quoted header value.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
