use std::collections::HashMap;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};

use crate::api::error::DagError;

const PAYLOAD_MAGIC: u8 = 0xDF;
const PAYLOAD_VERSION: u8 = 1;
/// magic + version + entry count
const PAYLOAD_HEADER_LEN: usize = 1 + 1 + 4;

/// Named, case-sensitive string key/value store.
///
/// Typed values are stored in their string form, so a payload produced by
/// [`Properties::to_bytes`] carries only strings.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    name: String,
    properties: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Properties {
            name: "".to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn with_name(name: &str) -> Self {
        Properties {
            name: name.to_string(),
            properties: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.properties.iter()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.as_str())
    }

    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn extend<I, K, V>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in iter {
            self.properties.insert(k.into(), v.into());
        }
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    pub fn set_string(&mut self, key: String, value: String) {
        self.properties.insert(key, value);
    }

    pub fn get_string(&self, key: &str) -> anyhow::Result<String> {
        match self.properties.get(key) {
            Some(v) => Ok(v.clone()),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set_string(key.to_string(), value.to_string());
    }

    pub fn get_bool(&self, key: &str) -> anyhow::Result<bool> {
        match self.properties.get(key) {
            Some(v) => bool::from_str(v.trim()).map_err(|e| anyhow!(e)),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    pub fn set_i32(&mut self, key: &str, value: i32) {
        self.set_string(key.to_string(), value.to_string());
    }

    pub fn get_i32(&self, key: &str) -> anyhow::Result<i32> {
        match self.properties.get(key) {
            Some(v) => i32::from_str(v.trim()).map_err(|e| anyhow!(e)),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    pub fn set_u32(&mut self, key: &str, value: u32) {
        self.set_string(key.to_string(), value.to_string());
    }

    pub fn get_u32(&self, key: &str) -> anyhow::Result<u32> {
        match self.properties.get(key) {
            Some(v) => u32::from_str(v.trim()).map_err(|e| anyhow!(e)),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.set_string(key.to_string(), value.to_string());
    }

    pub fn get_i64(&self, key: &str) -> anyhow::Result<i64> {
        match self.properties.get(key) {
            Some(v) => i64::from_str(v.trim()).map_err(|e| anyhow!(e)),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    pub fn set_u64(&mut self, key: &str, value: u64) {
        self.set_string(key.to_string(), value.to_string());
    }

    pub fn get_u64(&self, key: &str) -> anyhow::Result<u64> {
        match self.properties.get(key) {
            Some(v) => u64::from_str(v.trim()).map_err(|e| anyhow!(e)),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    pub fn set_f32(&mut self, key: &str, value: f32) {
        self.set_string(key.to_string(), value.to_string());
    }

    pub fn get_f32(&self, key: &str) -> anyhow::Result<f32> {
        match self.properties.get(key) {
            Some(v) => f32::from_str(v.trim()).map_err(|e| anyhow!(e)),
            None => Err(anyhow!("`{}` field not found", key)),
        }
    }

    /// Encode the key/value set as a binary payload.
    ///
    /// Layout: `magic(u8) version(u8) count(u32)` then `count` pairs of
    /// `key_len(u32) key value_len(u32) value`. Entries are written in key order so
    /// equal sets always produce equal payloads.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DagError> {
        let mut entries: Vec<(&String, &String)> = self.properties.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let body_len: usize = entries
            .iter()
            .map(|(k, v)| 4 + k.len() + 4 + v.len())
            .sum();
        let mut buffer = BytesMut::with_capacity(PAYLOAD_HEADER_LEN + body_len);
        buffer.put_u8(PAYLOAD_MAGIC);
        buffer.put_u8(PAYLOAD_VERSION);
        buffer.put_u32(self.checked_len(entries.len(), None)?);

        for (key, value) in entries {
            buffer.put_u32(self.checked_len(key.len(), Some(key))?);
            buffer.put_slice(key.as_bytes());
            buffer.put_u32(self.checked_len(value.len(), Some(key))?);
            buffer.put_slice(value.as_bytes());
        }

        Ok(buffer.to_vec())
    }

    /// Decode a payload produced by [`Properties::to_bytes`] into a fresh instance.
    pub fn from_bytes(name: &str, payload: &[u8]) -> Result<Self, DagError> {
        let err = |key: Option<&str>, msg: String| DagError::serialization(name, key, msg);

        let mut buffer = payload;
        if buffer.remaining() < PAYLOAD_HEADER_LEN {
            return Err(err(
                None,
                format!("payload too short, {} bytes", buffer.remaining()),
            ));
        }

        let magic = buffer.get_u8();
        if magic != PAYLOAD_MAGIC {
            return Err(err(None, format!("illegal payload magic 0x{:02X}", magic)));
        }
        let version = buffer.get_u8();
        if version != PAYLOAD_VERSION {
            return Err(err(None, format!("unsupported payload version {}", version)));
        }

        let count = buffer.get_u32() as usize;
        let mut properties = HashMap::with_capacity(count.min(1024));
        for index in 0..count {
            let key = read_string(&mut buffer)
                .map_err(|msg| err(None, format!("entry {}: key {}", index, msg)))?;
            let value = read_string(&mut buffer)
                .map_err(|msg| err(Some(key.as_str()), format!("value {}", msg)))?;

            if properties.contains_key(&key) {
                return Err(err(Some(key.as_str()), "duplicate key".to_string()));
            }
            properties.insert(key, value);
        }

        if buffer.has_remaining() {
            return Err(err(
                None,
                format!("{} trailing bytes after {} entries", buffer.remaining(), count),
            ));
        }

        Ok(Properties {
            name: name.to_string(),
            properties,
        })
    }

    fn checked_len(&self, len: usize, key: Option<&str>) -> Result<u32, DagError> {
        u32::try_from(len).map_err(|_| {
            DagError::serialization(
                self.name.as_str(),
                key,
                format!("length {} exceeds u32", len),
            )
        })
    }
}

fn read_string(buffer: &mut &[u8]) -> Result<String, String> {
    if buffer.remaining() < 4 {
        return Err("length truncated".to_string());
    }
    let len = buffer.get_u32() as usize;
    if buffer.remaining() < len {
        return Err(format!(
            "truncated, expect {} bytes, found {}",
            len,
            buffer.remaining()
        ));
    }

    let bytes = buffer.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("is not utf-8: {}", e))
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut properties = Properties::new();
        properties.extend(iter);
        properties
    }
}
