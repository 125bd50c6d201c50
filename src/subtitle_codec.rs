use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

// @module: SRT block parsing and serialization

// @const: Index line immediately followed by a timing line
static BLOCK_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\d+\s*\n\d{2}:\d{2}:\d{2},\d{3}\s*-->").unwrap()
});

// @const: Blank-line separator between blocks
static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

// @const: Segment starting with a bare integer line
static INDEX_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\s*\n").unwrap()
});

/// Separator placed between serialized blocks
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// One subtitle block, kept as its exact trimmed text.
///
/// Two blocks are the same block when their text is identical; that is what
/// deduplication of overlapping model responses relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtitleBlock(String);

impl SubtitleBlock {
    /// Wrap already-trimmed block text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The serialized block text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric index from the first line, if it parses
    pub fn index(&self) -> Option<usize> {
        self.0.lines().next().and_then(|line| line.trim().parse().ok())
    }
}

impl fmt::Display for SubtitleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubtitleBlock {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of splitting text into blocks, with the number of dropped segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockExtraction {
    /// Well-formed blocks in input order
    pub blocks: Vec<SubtitleBlock>,
    /// Non-empty segments that did not start with an index line
    pub discarded: usize,
}

/// Count the blocks in `text` that have an index line followed by a timing line.
///
/// This is the expected total for a job and is computed once from the input file.
pub fn count_blocks(text: &str) -> usize {
    BLOCK_HEADER_REGEX.find_iter(text).count()
}

/// Split `text` into blocks, silently dropping segments without an index line
pub fn extract_blocks(text: &str) -> Vec<SubtitleBlock> {
    extract_blocks_with_stats(text).blocks
}

/// Split `text` into blocks and report how many segments were dropped.
///
/// Model replies often carry prose around the subtitle blocks; those
/// segments are discarded rather than treated as errors.
pub fn extract_blocks_with_stats(text: &str) -> BlockExtraction {
    let mut extraction = BlockExtraction::default();

    for segment in SEPARATOR_REGEX.split(text) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        if INDEX_LINE_REGEX.is_match(segment) {
            extraction.blocks.push(SubtitleBlock::new(segment));
        } else {
            extraction.discarded += 1;
        }
    }

    if extraction.discarded > 0 {
        debug!(
            "Discarded {} malformed segment(s) while extracting {} block(s)",
            extraction.discarded,
            extraction.blocks.len()
        );
    }

    extraction
}

/// Join blocks with a blank line between them
pub fn serialize<B: AsRef<str>>(blocks: &[B]) -> String {
    blocks
        .iter()
        .map(|block| block.as_ref())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
