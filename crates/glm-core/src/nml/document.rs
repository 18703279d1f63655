use super::block::{NmlBlock, located};
use super::parser::parse_namelist;
use crate::common::serialization::write_text_artifact;
use crate::domain::{BlockKind, GlmError, GlmResult, ParamValue};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Tolerance for comparing depths against the morphometry height span.
const DEPTH_TOLERANCE: f64 = 1e-9;

/// A complete GLM configuration: at most one block of each kind, rendered
/// in the fixed GLM section order whatever the insertion order was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NmlDocument {
    blocks: BTreeMap<BlockKind, NmlBlock>,
}

impl NmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `block` under its kind, returning any block it replaced.
    pub fn add_block(&mut self, block: NmlBlock) -> Option<NmlBlock> {
        let replaced = self.blocks.insert(block.kind(), block);
        if let Some(previous) = &replaced {
            debug!(block = %previous.kind(), "replaced existing block");
        }
        replaced
    }

    pub fn block(&self, kind: BlockKind) -> Option<&NmlBlock> {
        self.blocks.get(&kind)
    }

    pub fn block_mut(&mut self, kind: BlockKind) -> Option<&mut NmlBlock> {
        self.blocks.get_mut(&kind)
    }

    /// Mutable access to the block of `kind`, creating an empty one first
    /// when the document has none.
    pub fn block_or_insert(&mut self, kind: BlockKind) -> &mut NmlBlock {
        self.blocks
            .entry(kind)
            .or_insert_with(|| NmlBlock::new(kind))
    }

    pub fn remove_block(&mut self, kind: BlockKind) -> Option<NmlBlock> {
        self.blocks.remove(&kind)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &NmlBlock> {
        self.blocks.values()
    }

    pub fn block_names(&self) -> Vec<&'static str> {
        self.blocks.keys().map(|kind| kind.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn validate(&self) -> GlmResult<()> {
        self.ensure_required_blocks()?;
        for block in self.blocks.values() {
            block.validate()?;
        }
        self.ensure_depth_within_basin()
    }

    pub fn render(&self) -> GlmResult<String> {
        self.validate()?;
        for block in self.blocks.values().filter(|block| block.is_empty()) {
            warn!(block = %block.kind(), "rendering block with no parameters");
        }
        let rendered: String = self
            .blocks
            .values()
            .map(|block| block.render() + "\n")
            .collect();
        debug!(blocks = self.blocks.len(), "rendered namelist document");
        Ok(rendered)
    }

    /// Validates, renders and writes the document. The target file is
    /// replaced in one step, so a failure never leaves a partial file.
    pub fn write(&self, path: &Path) -> GlmResult<()> {
        let rendered = self.render()?;
        write_text_artifact(path, &rendered).map_err(|source| {
            GlmError::io(format!(
                "failed to write namelist '{}': {}",
                path.display(),
                source
            ))
        })?;
        info!(path = %path.display(), blocks = self.blocks.len(), "wrote namelist");
        Ok(())
    }

    /// Parses namelist text into a document without validating it; call
    /// [`NmlDocument::validate`] before relying on completeness.
    pub fn from_text(text: &str) -> GlmResult<Self> {
        let mut document = Self::new();
        for parsed in parse_namelist(text)? {
            if document.blocks.contains_key(&parsed.kind) {
                return Err(GlmError::parse(
                    parsed.source_line,
                    format!("block '{}' appears more than once", parsed.kind.header()),
                ));
            }

            let mut block = NmlBlock::new(parsed.kind);
            for entry in parsed.entries {
                block
                    .set(&entry.name, entry.value)
                    .map_err(|error| located(error, entry.source_line))?;
            }
            document.add_block(block);
        }
        Ok(document)
    }

    fn ensure_required_blocks(&self) -> GlmResult<()> {
        let missing: Vec<String> = BlockKind::REQUIRED
            .iter()
            .filter(|kind| !self.blocks.contains_key(*kind))
            .map(|kind| kind.header())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        Err(GlmError::missing_block(format!(
            "missing required block(s): {}",
            missing.join(", ")
        )))
    }

    fn ensure_depth_within_basin(&self) -> GlmResult<()> {
        let lake_depth = self
            .block(BlockKind::InitProfiles)
            .and_then(|block| block.get("lake_depth"))
            .and_then(ParamValue::as_real);
        let heights = self
            .block(BlockKind::Morphometry)
            .and_then(|block| block.get("H"))
            .and_then(ParamValue::as_real_list);

        let (Some(lake_depth), Some(heights)) = (lake_depth, heights) else {
            return Ok(());
        };
        let (Some(lowest), Some(highest)) = (heights.first(), heights.last()) else {
            return Ok(());
        };

        let span = highest - lowest;
        if lake_depth > span + DEPTH_TOLERANCE {
            return Err(GlmError::cross_field(format!(
                "'&init_profiles' lake_depth {} exceeds the '&morphometry' height span {}",
                lake_depth, span
            )));
        }
        Ok(())
    }
}
