//! Conversion between the structured (JSON) form of a configuration and the
//! native namelist form.
//!
//! A structured document is an object keyed by block name, with or without
//! the leading `&`, whose values map parameter names to JSON scalars or
//! arrays. `null` leaves a parameter unset.

use crate::domain::{BlockKind, GlmError, GlmErrorKind, GlmResult};
use crate::nml::literal::{value_from_json, value_to_json};
use crate::nml::{NmlBlock, NmlDocument};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A parsed structured configuration, kept as JSON until it is converted so
/// individual blocks can be inspected first.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredNamelist {
    blocks: Map<String, Value>,
}

impl StructuredNamelist {
    pub fn from_value(value: Value) -> GlmResult<Self> {
        match value {
            Value::Object(blocks) => Ok(Self { blocks }),
            other => Err(GlmError::type_mismatch(format!(
                "structured configuration must be an object keyed by block name, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn parse_json(text: &str) -> GlmResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|source| {
            GlmError::new(
                GlmErrorKind::Parse,
                format!("invalid JSON at line {}: {}", source.line(), source),
            )
        })?;
        Self::from_value(value)
    }

    pub fn from_path(path: &Path) -> GlmResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| {
            GlmError::io(format!("failed to read '{}': {}", path.display(), source))
        })?;
        Self::parse_json(&text)
    }

    /// Block keys exactly as they appear in the source.
    pub fn block_names(&self) -> Vec<&str> {
        self.blocks.keys().map(String::as_str).collect()
    }

    /// Parameters of the block named `name`, matched through the same
    /// aliases as namelist headers.
    pub fn block_attributes(&self, name: &str) -> Option<&Map<String, Value>> {
        let kind = BlockKind::from_name(name)?;
        self.blocks
            .iter()
            .find(|(key, _)| BlockKind::from_name(key) == Some(kind))
            .and_then(|(_, value)| value.as_object())
    }

    pub fn to_document(&self) -> GlmResult<NmlDocument> {
        let mut document = NmlDocument::new();
        for (name, attributes) in &self.blocks {
            let block = structured_to_native(name, attributes)?;
            if document.block(block.kind()).is_some() {
                return Err(GlmError::invalid_parameter(format!(
                    "block '{}' is given more than once",
                    block.kind().header()
                )));
            }
            document.add_block(block);
        }
        debug!(blocks = document.len(), "converted structured configuration");
        Ok(document)
    }
}

/// Builds one block from a JSON object of parameters. Fails like
/// [`NmlBlock::set_many`] does, plus on unknown block names.
pub fn structured_to_native(block_name: &str, attributes: &Value) -> GlmResult<NmlBlock> {
    let kind = BlockKind::from_name(block_name).ok_or_else(|| {
        GlmError::new(
            GlmErrorKind::UnknownParameter,
            format!("unknown namelist block '{}'", block_name),
        )
    })?;
    let Value::Object(attributes) = attributes else {
        return Err(GlmError::type_mismatch(format!(
            "block '{}' must be an object of parameters, got {}",
            kind.header(),
            json_type_name(attributes)
        )));
    };

    let mut entries = Vec::with_capacity(attributes.len());
    for (name, value) in attributes {
        if value.is_null() {
            continue;
        }
        let value = value_from_json(value).ok_or_else(|| {
            GlmError::type_mismatch(format!(
                "parameter '{}' in '{}' has no namelist form ({})",
                name,
                kind.header(),
                json_type_name(value)
            ))
        })?;
        entries.push((name.as_str(), value));
    }

    NmlBlock::from_entries(kind, entries)
}

pub fn block_to_structured(block: &NmlBlock) -> Map<String, Value> {
    block
        .iter()
        .map(|(name, value)| (name.to_string(), value_to_json(value)))
        .collect()
}

/// Parses namelist text into a structured map keyed by `&`-prefixed block
/// names.
pub fn native_to_structured(text: &str) -> GlmResult<Map<String, Value>> {
    let document = NmlDocument::from_text(text)?;
    Ok(document_to_structured(&document))
}

pub fn document_to_structured(document: &NmlDocument) -> Map<String, Value> {
    document
        .blocks()
        .map(|block| {
            (
                block.kind().header(),
                Value::Object(block_to_structured(block)),
            )
        })
        .collect()
}

pub fn document_from_structured(value: &Value) -> GlmResult<NmlDocument> {
    StructuredNamelist::from_value(value.clone())?.to_document()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
