use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::VectorRecord;
use crate::error::{KnowledgeError, KnowledgeResult};

/// Scalar metadata value stored alongside an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// An entry stored in a vector index: an id, one embedding, and a payload.
///
/// Items carry no namespace of their own; the repository they are saved
/// through decides where they live.
pub trait KnowledgeItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn embedding(&self) -> &[f32];

    /// Assign an id; used by `save` when the caller left it blank.
    fn set_id(&mut self, id: String);

    fn into_record(self) -> KnowledgeResult<VectorRecord>;

    fn from_record(record: VectorRecord) -> KnowledgeResult<Self>;
}

/// A search hit with the score the remote service assigned
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

/// Generate an id for an item saved without one
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// JSON has no NaN or infinity, so such values would not survive a round trip.
fn check_metadata(metadata: &Metadata) -> KnowledgeResult<()> {
    for (key, value) in metadata {
        if let MetadataValue::Float(f) = value {
            if !f.is_finite() {
                return Err(KnowledgeError::InvalidArgument(format!(
                    "metadata '{}' must be a finite number, got {}",
                    key, f
                )));
            }
        }
    }
    Ok(())
}

fn encode_payload<P: Serialize>(
    payload: &P,
) -> KnowledgeResult<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(payload)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(KnowledgeError::Payload(format!(
            "expected a JSON object payload, got {}",
            other
        ))),
    }
}

fn decode_payload<P: DeserializeOwned>(
    payload: serde_json::Map<String, serde_json::Value>,
) -> KnowledgeResult<P> {
    Ok(serde_json::from_value(serde_json::Value::Object(payload))?)
}

/// A chunk of text and its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct TextKnowledge {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Serialize, Deserialize)]
struct TextPayload {
    text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Metadata,
}

impl TextKnowledge {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            embedding,
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Item whose id is assigned when saved
    pub fn unsaved(embedding: Vec<f32>, text: impl Into<String>) -> Self {
        Self::new(String::new(), embedding, text)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl KnowledgeItem for TextKnowledge {
    fn id(&self) -> &str {
        &self.id
    }

    fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn into_record(self) -> KnowledgeResult<VectorRecord> {
        check_metadata(&self.metadata)?;
        let payload = encode_payload(&TextPayload {
            text: self.text,
            metadata: self.metadata,
        })?;
        Ok(VectorRecord::new(self.id, self.embedding).with_payload(payload))
    }

    fn from_record(record: VectorRecord) -> KnowledgeResult<Self> {
        let payload: TextPayload = decode_payload(record.payload)?;
        Ok(Self {
            id: record.id,
            embedding: record.values,
            text: payload.text,
            metadata: payload.metadata,
        })
    }
}

/// A reference to an image and its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ImageKnowledge {
    pub id: String,
    pub embedding: Vec<f32>,
    /// Where the image lives (URL or object-store key); the bytes are not stored
    pub image_uri: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    pub metadata: Metadata,
}

#[derive(Serialize, Deserialize)]
struct ImagePayload {
    image_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Metadata,
}

impl ImageKnowledge {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>, image_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            embedding,
            image_uri: image_uri.into(),
            mime_type: None,
            caption: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl KnowledgeItem for ImageKnowledge {
    fn id(&self) -> &str {
        &self.id
    }

    fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn into_record(self) -> KnowledgeResult<VectorRecord> {
        check_metadata(&self.metadata)?;
        let payload = encode_payload(&ImagePayload {
            image_uri: self.image_uri,
            mime_type: self.mime_type,
            caption: self.caption,
            metadata: self.metadata,
        })?;
        Ok(VectorRecord::new(self.id, self.embedding).with_payload(payload))
    }

    fn from_record(record: VectorRecord) -> KnowledgeResult<Self> {
        let payload: ImagePayload = decode_payload(record.payload)?;
        Ok(Self {
            id: record.id,
            embedding: record.values,
            image_uri: payload.image_uri,
            mime_type: payload.mime_type,
            caption: payload.caption,
            metadata: payload.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_record_payload_shape() {
        let item = TextKnowledge::new("a", vec![0.1, 0.2], "hello").with_metadata("page", 3i64);
        let record = item.into_record().unwrap();

        assert_eq!(record.id, "a");
        assert_eq!(record.values, vec![0.1, 0.2]);
        assert_eq!(
            serde_json::Value::Object(record.payload),
            json!({"text": "hello", "metadata": {"page": 3}})
        );
    }

    #[test]
    fn test_text_without_metadata_omits_field() {
        let record = TextKnowledge::new("a", vec![1.0], "hi").into_record().unwrap();
        assert!(!record.payload.contains_key("metadata"));
    }

    #[test]
    fn test_image_from_record() {
        let payload = json!({
            "image_uri": "s3://bucket/cat.png",
            "caption": "a cat",
            "metadata": {"width": 640, "nsfw": false, "source": "upload"}
        });
        let serde_json::Value::Object(map) = payload else {
            unreachable!()
        };

        let record = VectorRecord::new("img-1", vec![0.5]).with_payload(map);
        let image = ImageKnowledge::from_record(record).unwrap();

        assert_eq!(image.image_uri, "s3://bucket/cat.png");
        assert_eq!(image.caption.as_deref(), Some("a cat"));
        assert_eq!(image.mime_type, None);
        assert_eq!(image.metadata.get("width"), Some(&MetadataValue::Integer(640)));
        assert_eq!(image.metadata.get("nsfw"), Some(&MetadataValue::Bool(false)));
        assert_eq!(
            image.metadata.get("source"),
            Some(&MetadataValue::String("upload".to_string()))
        );
    }

    #[test]
    fn test_from_record_missing_field_is_payload_error() {
        let err = TextKnowledge::from_record(VectorRecord::new("a", vec![1.0])).unwrap_err();
        assert!(matches!(err, KnowledgeError::Payload(_)));
    }

    #[test]
    fn test_non_finite_metadata_is_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = TextKnowledge::new("a", vec![0.1], "hello")
                .with_metadata("score", bad)
                .into_record()
                .unwrap_err();
            assert!(matches!(err, KnowledgeError::InvalidArgument(ref m) if m.contains("score")));
        }

        let err = ImageKnowledge::new("i", vec![0.1], "s3://bucket/cat.png")
            .with_metadata("ratio", f64::NAN)
            .into_record()
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_metadata_float_stays_float() {
        let value: MetadataValue = serde_json::from_value(json!(0.25)).unwrap();
        assert_eq!(value, MetadataValue::Float(0.25));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
