use std::collections::BTreeMap;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::{json, Value as JsonValue};

use crate::api::{DocumentSnapshot, WriteResult};
use crate::error::{internal_error, ProtoStoreResult};
use crate::model::{DatabaseId, DocumentKey, GeoPoint, Timestamp};
use crate::value::{BytesValue, FirestoreValue, MapValue, ValueKind};

/// Converts between document values and the REST JSON representation.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn database_name(&self) -> String {
        self.database_id.database_name()
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!(
            "{}/documents/{}",
            self.database_name(),
            key.path().canonical_string()
        )
    }

    /// Strips the database prefix from a resource name returned by the backend.
    pub fn parse_document_name(&self, name: &str) -> ProtoStoreResult<DocumentKey> {
        let prefix = format!("{}/documents/", self.database_name());
        let relative = name.strip_prefix(&prefix).ok_or_else(|| {
            internal_error(format!("Unexpected document name '{name}' returned by the backend"))
        })?;
        DocumentKey::from_string(relative)
    }

    pub fn encode_set_write(&self, key: &DocumentKey, map: &MapValue) -> JsonValue {
        json!({
            "update": {
                "name": self.document_name(key),
                "fields": encode_map_fields(map)
            }
        })
    }

    pub fn encode_delete_write(&self, key: &DocumentKey) -> JsonValue {
        json!({
            "delete": self.document_name(key)
        })
    }

    pub fn encode_commit_body(&self, writes: Vec<JsonValue>) -> JsonValue {
        json!({ "writes": writes })
    }

    /// Decodes a `Document` resource into a snapshot.
    pub fn decode_document(&self, document: &JsonValue) -> ProtoStoreResult<DocumentSnapshot> {
        let name = document
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("Document resource is missing its 'name' field"))?;
        let key = self.parse_document_name(name)?;
        let fields = decode_map_value(document)?;
        let update_time = document
            .get("updateTime")
            .and_then(JsonValue::as_str)
            .map(Timestamp::parse_rfc3339)
            .transpose()?;
        Ok(DocumentSnapshot::new(key, Some(fields)).with_update_time(update_time))
    }

    /// Reads the acknowledgment of a single-write commit.
    pub fn decode_write_result(&self, response: &JsonValue) -> ProtoStoreResult<WriteResult> {
        let update_time = response
            .get("writeResults")
            .and_then(JsonValue::as_array)
            .and_then(|results| results.first())
            .and_then(|result| result.get("updateTime"))
            .or_else(|| response.get("commitTime"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| internal_error("Commit response carries no update time"))?;
        Ok(WriteResult::new(Timestamp::parse_rfc3339(update_time)?))
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> JsonValue {
        encode_value(value)
    }

    pub fn decode_value(&self, value: &JsonValue) -> ProtoStoreResult<FirestoreValue> {
        decode_value(value)
    }
}

fn encode_map_fields(map: &MapValue) -> JsonValue {
    let mut fields = serde_json::Map::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

fn encode_value(value: &FirestoreValue) -> JsonValue {
    match value.kind() {
        ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::Double(double) => json!({ "doubleValue": double }),
        ValueKind::Timestamp(timestamp) => json!({ "timestampValue": timestamp.to_rfc3339() }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Bytes(bytes) => json!({ "bytesValue": bytes.to_base64() }),
        ValueKind::Reference(reference) => json!({ "referenceValue": reference }),
        ValueKind::GeoPoint(point) => json!({
            "geoPointValue": {
                "latitude": point.latitude(),
                "longitude": point.longitude(),
            }
        }),
        ValueKind::Array(array) => {
            let values = array.values().iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
    }
}

fn decode_map_value(value: &JsonValue) -> ProtoStoreResult<MapValue> {
    let map = value
        .as_object()
        .ok_or_else(|| internal_error("Expected object for map value"))?;
    let fields_object = match map.get("fields") {
        Some(fields_value) => fields_value
            .as_object()
            .ok_or_else(|| internal_error("Expected 'fields' to be an object"))?,
        None => return Ok(MapValue::default()),
    };

    let mut fields = BTreeMap::new();
    for (key, value) in fields_object {
        fields.insert(key.clone(), decode_value(value)?);
    }
    Ok(MapValue::new(fields))
}

fn decode_value(value: &JsonValue) -> ProtoStoreResult<FirestoreValue> {
    let object = value
        .as_object()
        .ok_or_else(|| internal_error("Expected value object"))?;
    if object.contains_key("nullValue") {
        return Ok(FirestoreValue::null());
    }
    if let Some(bool_value) = object.get("booleanValue") {
        let value = bool_value
            .as_bool()
            .ok_or_else(|| internal_error("booleanValue must be bool"))?;
        return Ok(FirestoreValue::from_bool(value));
    }
    if let Some(integer_value) = object.get("integerValue") {
        let parsed = match integer_value {
            JsonValue::String(value) => i64::from_str(value)
                .map_err(|err| internal_error(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| internal_error("Integer out of range"))?,
            _ => return Err(internal_error("integerValue must be a string or number")),
        };
        return Ok(FirestoreValue::from_integer(parsed));
    }
    if let Some(double_value) = object.get("doubleValue") {
        let parsed = match double_value {
            JsonValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| internal_error("Invalid doubleValue"))?,
            JsonValue::String(value) => value
                .parse::<f64>()
                .map_err(|err| internal_error(format!("Invalid doubleValue: {err}")))?,
            _ => return Err(internal_error("doubleValue must be a number or string")),
        };
        return Ok(FirestoreValue::from_double(parsed));
    }
    if let Some(timestamp_value) = object.get("timestampValue") {
        let text = timestamp_value
            .as_str()
            .ok_or_else(|| internal_error("timestampValue must be string"))?;
        return Ok(FirestoreValue::from_timestamp(Timestamp::parse_rfc3339(text)?));
    }
    if let Some(string_value) = object.get("stringValue") {
        let text = string_value
            .as_str()
            .ok_or_else(|| internal_error("stringValue must be string"))?;
        return Ok(FirestoreValue::from_string(text));
    }
    if let Some(bytes_value) = object.get("bytesValue") {
        let text = bytes_value
            .as_str()
            .ok_or_else(|| internal_error("bytesValue must be base64 string"))?;
        let decoded = BASE64_STANDARD
            .decode(text)
            .map_err(|err| internal_error(format!("Invalid bytesValue: {err}")))?;
        return Ok(FirestoreValue::from_bytes(BytesValue::from(decoded)));
    }
    if let Some(reference_value) = object.get("referenceValue") {
        let text = reference_value
            .as_str()
            .ok_or_else(|| internal_error("referenceValue must be string"))?;
        return Ok(FirestoreValue::from_reference(text));
    }
    if let Some(geo_point) = object.get("geoPointValue") {
        let latitude = geo_point
            .get("latitude")
            .and_then(JsonValue::as_f64)
            .unwrap_or_default();
        let longitude = geo_point
            .get("longitude")
            .and_then(JsonValue::as_f64)
            .unwrap_or_default();
        let point = GeoPoint::new(latitude, longitude)
            .map_err(|err| internal_error(err.message().to_string()))?;
        return Ok(FirestoreValue::from_geo_point(point));
    }
    if let Some(array_value) = object.get("arrayValue") {
        let decoded = match array_value.get("values").and_then(JsonValue::as_array) {
            Some(entries) => entries
                .iter()
                .map(decode_value)
                .collect::<ProtoStoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        return Ok(FirestoreValue::from_array(decoded));
    }
    if let Some(map_value) = object.get("mapValue") {
        let map = decode_map_value(map_value)?;
        return Ok(FirestoreValue::from_map(map.into_fields()));
    }

    Err(internal_error("Unknown value type"))
}
