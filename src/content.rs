use base64::Engine;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

use crate::gemini_api::{GeminiError, Result};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mpeg"];

/// Kinds of media a request can carry next to the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// File extensions the uploader accepts for this kind
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    /// MIME type sent for a file with the given (lowercase) extension
    pub fn mime_type_for(&self, ext: &str) -> Option<&'static str> {
        match (self, ext) {
            (MediaKind::Image, "jpg" | "jpeg") => Some("image/jpeg"),
            (MediaKind::Image, "png") => Some("image/png"),
            (MediaKind::Video, "mp4") => Some("video/mp4"),
            (MediaKind::Video, "mpeg") => Some("video/mpeg"),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(format!("Content Type {} not supported", s)),
        }
    }
}

/// One fragment of a generation request.
///
/// Images travel as raw bytes and are encoded when the request is serialized;
/// videos are base64-encoded up front. Both end up as `inlineData` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineBlob { mime_type: String, data: Vec<u8> },
    EncodedData { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn inline_blob(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Part::InlineBlob {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Base64-encode `data` now and keep the encoded string
    pub fn encoded(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Part::EncodedData {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Part::Text(_) => None,
            Part::InlineBlob { mime_type, .. } | Part::EncodedData { mime_type, .. } => {
                Some(mime_type)
            }
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: WireBlob<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob<'a> {
    mime_type: &'a str,
    data: Cow<'a, str>,
}

impl Serialize for Part {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let wire = match self {
            Part::Text(text) => WirePart::Text { text: text.as_str() },
            Part::InlineBlob { mime_type, data } => WirePart::Inline {
                inline_data: WireBlob {
                    mime_type: mime_type.as_str(),
                    data: Cow::Owned(base64::engine::general_purpose::STANDARD.encode(data)),
                },
            },
            Part::EncodedData { mime_type, data } => WirePart::Inline {
                inline_data: WireBlob {
                    mime_type: mime_type.as_str(),
                    data: Cow::Borrowed(data.as_str()),
                },
            },
        };
        wire.serialize(serializer)
    }
}

/// Ordered parts submitted together as one user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { role: "user", parts }
    }

    /// `[text, raw image blob]`
    pub fn image(prompt: &str, upload: &Upload) -> Self {
        Self::new(vec![
            Part::text(prompt),
            Part::inline_blob(upload.mime_type, upload.data.clone()),
        ])
    }

    /// `[text, base64 video data]`
    pub fn video(prompt: &str, upload: &Upload) -> Self {
        Self::new(vec![
            Part::text(prompt),
            Part::encoded(upload.mime_type, &upload.data),
        ])
    }
}

/// A user-supplied file that passed the extension filter for its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub kind: MediaKind,
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn from_bytes(kind: MediaKind, file_name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let ext = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let mime_type = kind
            .mime_type_for(&ext)
            .ok_or_else(|| GeminiError::UnsupportedFileType {
                kind,
                file_name: file_name.clone(),
            })?;

        Ok(Self {
            kind,
            file_name,
            mime_type,
            data,
        })
    }

    pub async fn from_path<P: AsRef<Path>>(kind: MediaKind, path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        // Check the extension before reading a possibly large file.
        Self::from_bytes(kind, file_name.clone(), Vec::new())?;

        let data = fs::read(path).await?;
        Self::from_bytes(kind, file_name, data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_kind_from_str() {
        assert_eq!(MediaKind::from_str("image").unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::from_str("Video").unwrap(), MediaKind::Video);
        assert!(MediaKind::from_str("audio").is_err());
        assert!(MediaKind::from_str("").is_err());
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(MediaKind::Image.mime_type_for("jpg"), Some("image/jpeg"));
        assert_eq!(MediaKind::Image.mime_type_for("jpeg"), Some("image/jpeg"));
        assert_eq!(MediaKind::Image.mime_type_for("png"), Some("image/png"));
        assert_eq!(MediaKind::Video.mime_type_for("mp4"), Some("video/mp4"));
        assert_eq!(MediaKind::Video.mime_type_for("mpeg"), Some("video/mpeg"));
        assert_eq!(MediaKind::Image.mime_type_for("mp4"), None);
        assert_eq!(MediaKind::Video.mime_type_for("gif"), None);
    }

    #[test]
    fn test_upload_extension_filter() {
        let upload = Upload::from_bytes(MediaKind::Image, "cat.JPG", vec![0xff, 0xd8]).unwrap();
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.size(), 2);

        let err = Upload::from_bytes(MediaKind::Image, "cat.gif", vec![]).unwrap_err();
        assert!(matches!(err, GeminiError::UnsupportedFileType { .. }));

        assert!(Upload::from_bytes(MediaKind::Video, "noext", vec![]).is_err());
    }

    #[test]
    fn test_image_payload_keeps_raw_bytes() {
        let upload = Upload::from_bytes(MediaKind::Image, "photo.jpeg", vec![1, 2, 3, 4]).unwrap();
        let content = Content::image("Describe this image", &upload);

        assert_eq!(content.parts.len(), 2);
        assert_eq!(content.parts[0], Part::Text("Describe this image".to_string()));
        assert_eq!(
            content.parts[1],
            Part::InlineBlob {
                mime_type: "image/jpeg".to_string(),
                data: vec![1, 2, 3, 4],
            }
        );
    }

    #[test]
    fn test_video_payload_is_base64_encoded() {
        let upload = Upload::from_bytes(MediaKind::Video, "clip.mp4", vec![1, 2, 3, 4]).unwrap();
        let content = Content::video("Summarize this clip", &upload);

        assert_eq!(content.parts[0], Part::Text("Summarize this clip".to_string()));
        assert_eq!(
            content.parts[1],
            Part::EncodedData {
                mime_type: "video/mp4".to_string(),
                data: "AQIDBA==".to_string(),
            }
        );
    }

    #[test]
    fn test_mpeg_video_keeps_its_own_mime_type() {
        let upload = Upload::from_bytes(MediaKind::Video, "lecture.MPEG", vec![0, 0, 1, 0xba]).unwrap();
        let content = Content::video("Summarize this clip", &upload);

        assert_eq!(
            content.parts[1],
            Part::EncodedData {
                mime_type: "video/mpeg".to_string(),
                data: "AAABug==".to_string(),
            }
        );
    }

    #[test]
    fn test_wire_format() {
        let content = Content::new(vec![
            Part::text("hi"),
            Part::inline_blob("image/png", vec![1, 2, 3, 4]),
            Part::encoded("video/mp4", &[1, 2, 3, 4]),
        ]);

        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "parts": [
                    {"text": "hi"},
                    {"inlineData": {"mimeType": "image/png", "data": "AQIDBA=="}},
                    {"inlineData": {"mimeType": "video/mp4", "data": "AQIDBA=="}}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"fake video").await.unwrap();

        let upload = Upload::from_path(MediaKind::Video, &path).await.unwrap();
        assert_eq!(upload.file_name, "clip.mp4");
        assert_eq!(upload.mime_type, "video/mp4");
        assert_eq!(upload.data, b"fake video");
    }

    #[tokio::test]
    async fn test_upload_from_path_rejects_before_reading() {
        // The file does not exist; the extension check must fail first.
        let err = Upload::from_path(MediaKind::Image, "/nonexistent/notes.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::UnsupportedFileType { .. }));
    }
}
