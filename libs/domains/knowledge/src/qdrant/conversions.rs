//! Mapping between [`VectorRecord`] and Qdrant points.
//!
//! Qdrant point ids must be UUIDs or integers, so caller ids are hashed into a
//! namespace-scoped UUIDv5 and kept verbatim in the payload. The namespace
//! lives in the payload too and is what queries filter on.

use std::collections::HashMap;

use qdrant_client::qdrant::{self, PointId, Value as QdrantValue};
use uuid::Uuid;

use crate::client::VectorRecord;
use crate::error::ClientError;

pub const NAMESPACE_FIELD: &str = "namespace";
pub const ITEM_ID_FIELD: &str = "item_id";

/// Deterministic point id for `(namespace, id)`.
pub fn point_id(namespace: &str, id: &str) -> PointId {
    let key = format!("{}/{}", namespace, id);
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string())
}

pub fn record_to_payload(
    namespace: &str,
    record: &VectorRecord,
) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = record
        .payload
        .iter()
        .filter_map(|(key, val)| json_to_qdrant_value(val.clone()).map(|v| (key.clone(), v)))
        .collect();

    payload.insert(NAMESPACE_FIELD.to_string(), QdrantValue::from(namespace.to_string()));
    payload.insert(ITEM_ID_FIELD.to_string(), QdrantValue::from(record.id.clone()));
    payload
}

/// Rebuild a record from a stored point, stripping the bookkeeping fields.
pub fn payload_to_record(
    mut payload: HashMap<String, QdrantValue>,
    values: Vec<f32>,
) -> Result<VectorRecord, ClientError> {
    payload.remove(NAMESPACE_FIELD);

    let id = match payload.remove(ITEM_ID_FIELD).and_then(qdrant_value_to_json) {
        Some(serde_json::Value::String(id)) => id,
        _ => {
            return Err(ClientError::decode(format!(
                "point is missing the '{}' payload field",
                ITEM_ID_FIELD
            )));
        }
    };

    let mut map = serde_json::Map::new();
    for (key, val) in payload {
        if let Some(json_val) = qdrant_value_to_json(val) {
            map.insert(key, json_val);
        }
    }

    Ok(VectorRecord::new(id, values).with_payload(map))
}

pub fn json_to_qdrant_value(val: serde_json::Value) -> Option<QdrantValue> {
    match val {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(QdrantValue::from(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(QdrantValue::from(i))
            } else {
                n.as_f64().map(QdrantValue::from)
            }
        }
        serde_json::Value::String(s) => Some(QdrantValue::from(s)),
        serde_json::Value::Array(items) => Some(QdrantValue {
            kind: Some(qdrant::value::Kind::ListValue(qdrant::ListValue {
                values: items.into_iter().filter_map(json_to_qdrant_value).collect(),
            })),
        }),
        serde_json::Value::Object(map) => Some(QdrantValue {
            kind: Some(qdrant::value::Kind::StructValue(qdrant::Struct {
                fields: map
                    .into_iter()
                    .filter_map(|(k, v)| json_to_qdrant_value(v).map(|v| (k, v)))
                    .collect(),
            })),
        }),
    }
}

pub fn qdrant_value_to_json(val: QdrantValue) -> Option<serde_json::Value> {
    use qdrant::value::Kind;

    match val.kind {
        Some(Kind::NullValue(_)) => Some(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => Some(serde_json::Value::Bool(b)),
        Some(Kind::IntegerValue(i)) => Some(serde_json::Value::Number(i.into())),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
        Some(Kind::StringValue(s)) => Some(serde_json::Value::String(s)),
        Some(Kind::ListValue(list)) => Some(serde_json::Value::Array(
            list.values.into_iter().filter_map(qdrant_value_to_json).collect(),
        )),
        Some(Kind::StructValue(s)) => Some(serde_json::Value::Object(
            s.fields
                .into_iter()
                .filter_map(|(k, v)| qdrant_value_to_json(v).map(|v| (k, v)))
                .collect(),
        )),
        None => None,
    }
}

/// Extract vector values from VectorsOutput
/// Note: Uses deprecated data field for now until migration to 1.18+
#[allow(deprecated)]
pub fn extract_vector(vectors: &Option<qdrant::VectorsOutput>) -> Vec<f32> {
    match vectors {
        Some(qdrant::VectorsOutput {
            vectors_options: Some(opts),
        }) => match opts {
            qdrant::vectors_output::VectorsOptions::Vector(v) => v.data.clone(),
            qdrant::vectors_output::VectorsOptions::Vectors(map) => map
                .vectors
                .values()
                .next()
                .map(|v| v.data.clone())
                .unwrap_or_default(),
        },
        _ => Vec::new(),
    }
}
