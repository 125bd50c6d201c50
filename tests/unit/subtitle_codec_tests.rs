/*!
 * Tests for block counting, extraction and serialization
 */

use subsession::subtitle_codec::{self, SubtitleBlock};
use crate::common;

#[test]
fn test_countBlocks_withGeneratedFile_shouldCountEveryBlock() {
    assert_eq!(subtitle_codec::count_blocks(&common::source_srt(12)), 12);
    assert_eq!(subtitle_codec::count_blocks(""), 0);
}

#[test]
fn test_countBlocks_withoutTimestamps_shouldCountNothing() {
    let text = "1\nHello\n\n2\nWorld\n";
    assert_eq!(subtitle_codec::count_blocks(text), 0);
}

#[test]
fn test_extractBlocks_withChattyReply_shouldKeepOnlyBlocks() {
    let reply = format!(
        "Here is the translation:\n\n{}\n\n{}\n\nLet me know if you need more.",
        common::translated_block(1),
        common::translated_block(2)
    );

    let extraction = subtitle_codec::extract_blocks_with_stats(&reply);

    assert_eq!(extraction.blocks, vec![common::translated_block(1), common::translated_block(2)]);
    assert_eq!(extraction.discarded, 2);
}

#[test]
fn test_extractBlocks_withExtraBlankLines_shouldTrimSegments() {
    let reply = "\n\n  1\n00:00:01,000 --> 00:00:02,000\nOi  \n\n\n\n2\n00:00:03,000 --> 00:00:04,000\nTchau\n\n";

    let blocks = subtitle_codec::extract_blocks(reply);

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].as_str(), "1\n00:00:01,000 --> 00:00:02,000\nOi");
    assert_eq!(blocks[1].index(), Some(2));
}

#[test]
fn test_serialize_thenCount_shouldPreserveBlockCount() {
    let blocks: Vec<SubtitleBlock> = (1..=7).map(common::translated_block).collect();

    let text = subtitle_codec::serialize(&blocks);

    assert_eq!(subtitle_codec::count_blocks(&text), 7);
    assert_eq!(subtitle_codec::extract_blocks(&text), blocks);
    assert!(!text.ends_with('\n'));
}
