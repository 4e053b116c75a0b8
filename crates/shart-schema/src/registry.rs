use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::field::FieldKind;
use crate::spec::{PacketSpec, PacketTag};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    spec: PacketSpec,
}

/// Tag-keyed registry of packet layouts.
///
/// Built once per deployment and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PacketRegistry {
    entries: HashMap<PacketTag, Entry>,
}

impl PacketRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layout for a tag. Each tag can only be registered once.
    pub fn register(
        &mut self,
        tag: PacketTag,
        name: impl Into<String>,
        spec: PacketSpec,
    ) -> Result<()> {
        if self.entries.contains_key(&tag) {
            return Err(SchemaError::DuplicateTag(tag));
        }
        let name = name.into();
        debug!(tag, %name, %spec, "registered packet layout");
        self.entries.insert(tag, Entry { name, spec });
        Ok(())
    }

    /// Look up the layout for a tag.
    pub fn lookup(&self, tag: PacketTag) -> Option<&PacketSpec> {
        self.entries.get(&tag).map(|entry| &entry.spec)
    }

    /// Registered name of a tag.
    pub fn name(&self, tag: PacketTag) -> Option<&str> {
        self.entries.get(&tag).map(|entry| entry.name.as_str())
    }

    /// Registered tags in ascending order.
    pub fn tags(&self) -> Vec<PacketTag> {
        let mut tags: Vec<PacketTag> = self.entries.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a registry document.
    ///
    /// ```json
    /// { "packets": [
    ///     { "tag": "0x0B", "name": "sensor", "payload_length": 44, "format": "<I6h5f3h2B" },
    ///     { "tag": 202, "name": "gps", "payload_length": 52,
    ///       "fields": ["u32", "i32", "i32", "..."] }
    /// ] }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        let mut registry = Self::new();

        for packet in document.packets {
            let tag = packet.tag.resolve()?;
            let spec = match (packet.format, packet.fields) {
                (Some(format), None) => PacketSpec::from_format(packet.payload_length, &format)?,
                (None, Some(fields)) => {
                    let fields = fields
                        .iter()
                        .map(|name| name.parse::<FieldKind>())
                        .collect::<Result<Vec<_>>>()?;
                    PacketSpec::new(packet.payload_length, fields)?
                }
                _ => {
                    return Err(SchemaError::LoadFailed(format!(
                        "packet 0x{tag:02X} must declare exactly one of \"format\" or \"fields\""
                    )))
                }
            };
            let name = packet.name.unwrap_or_else(|| format!("0x{tag:02X}"));
            registry.register(tag, name, spec)?;
        }

        Ok(registry)
    }

    /// Load a registry file with default config.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_config(path, RegistryConfig::default())
    }

    /// Load a registry file with explicit config.
    pub fn from_file_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;
        let metadata = file
            .metadata()
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

        if !metadata.is_file() {
            return Err(SchemaError::LoadFailed(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if metadata.len() > config.max_file_size as u64 {
            return Err(SchemaError::LoadFailed(format!(
                "registry file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let read_limit = u64::try_from(config.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                SchemaError::LoadFailed(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > config.max_file_size {
            return Err(SchemaError::LoadFailed(format!(
                "registry file too large while reading: {}",
                path.display()
            )));
        }

        Self::from_json(&content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    packets: Vec<PacketEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PacketEntry {
    tag: TagValue,
    #[serde(default)]
    name: Option<String>,
    payload_length: usize,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagValue {
    Number(u8),
    Text(String),
}

impl TagValue {
    fn resolve(&self) -> Result<PacketTag> {
        match self {
            TagValue::Number(tag) => Ok(*tag),
            TagValue::Text(text) => parse_tag(text).ok_or_else(|| {
                SchemaError::LoadFailed(format!("invalid packet tag: {text:?}"))
            }),
        }
    }
}

/// Parse a tag written as decimal (`202`) or hex (`0xCA`).
pub fn parse_tag(text: &str) -> Option<PacketTag> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => text.parse::<u8>().ok(),
    }
}
