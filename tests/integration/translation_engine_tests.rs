/*!
 * Integration tests for single-file translation runs
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use subsession::errors::{ProviderError, TranslationError};
use subsession::file_utils::FileManager;
use subsession::providers::mock::{MockBackend, MockReply};
use subsession::subtitle_codec::{self, SubtitleBlock};
use subsession::translation::prompts::{CONTINUE_MESSAGE, MESSAGE_PART_SEPARATOR};
use subsession::translation::{
    EngineConfig, EventSink, ProgressFile, TranslationEngine, TranslationEvent, TranslationOutcome,
};
use crate::common;

fn engine(backend: &MockBackend, config: EngineConfig) -> TranslationEngine<MockBackend> {
    TranslationEngine::new(backend.clone(), common::api_keys(1), config)
        .expect("engine with one key")
}

fn output_blocks(path: &std::path::Path) -> Vec<SubtitleBlock> {
    let text = FileManager::read_to_string(path).expect("output readable");
    subtitle_codec::extract_blocks(&text)
}

/// Whole file comes back in one reply
#[tokio::test]
async fn test_translateFile_withCompleteFirstReply_shouldWriteOutputAndRemoveProgress() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 5)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([MockReply::text(common::translated_reply(1..=5))]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let outcome = engine.translate_file(&common::request(&input, &output), || false).await?;

    assert!(outcome.is_completed());
    assert_eq!(outcome.report().translated_blocks, 5);
    assert_eq!(outcome.report().total_blocks, 5);
    assert_eq!(output_blocks(&output), (1..=5).map(common::translated_block).collect::<Vec<_>>());
    assert!(!ProgressFile::for_output(&output).exists());

    let sent = backend.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("English"));
    assert!(sent[0].text.contains("Portuguese"));
    assert!(sent[0].text.contains(MESSAGE_PART_SEPARATOR));
    assert!(sent[0].text.contains(common::source_block(3).as_str()));
    Ok(())
}

/// Replies arrive in pieces and one continuation overlaps the previous one
#[tokio::test]
async fn test_translateFile_withPartialReplies_shouldContinueUntilComplete() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 6)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(format!("Sure, here it is:\n\n{}", common::translated_reply(1..=2))),
        MockReply::text(common::translated_reply(2..=4)),
        MockReply::text(common::translated_reply(5..=6)),
    ]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let outcome = engine.translate_file(&common::request(&input, &output), || false).await?;

    let report = outcome.report();
    assert_eq!(report.translated_blocks, 6);
    assert_eq!(report.stats.requests, 3);
    assert_eq!(report.stats.duplicates_skipped, 1);
    assert_eq!(report.stats.discarded_segments, 1);

    let sent = backend.sent();
    assert_eq!(sent[1].text, CONTINUE_MESSAGE);
    assert_eq!(sent[2].text, CONTINUE_MESSAGE);
    assert_eq!(sent[2].history_len, 4);
    assert_eq!(output_blocks(&output).len(), 6);
    Ok(())
}

/// An existing checkpoint skips the opening message
#[tokio::test]
async fn test_translateFile_withProgressFile_shouldResumeWithContinue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 5)?;
    let output = temp_dir.path().join("movie.pt.srt");
    let progress = ProgressFile::for_output(&output);
    let saved: Vec<SubtitleBlock> = (1..=3).map(common::translated_block).collect();
    progress.save(&saved)?;

    let backend = MockBackend::with_script([MockReply::text(common::translated_reply(4..=5))]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let outcome = engine.translate_file(&common::request(&input, &output), || false).await?;

    assert!(outcome.is_completed());
    let sent = backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, CONTINUE_MESSAGE);
    assert_eq!(output_blocks(&output), (1..=5).map(common::translated_block).collect::<Vec<_>>());
    assert!(!progress.exists());
    Ok(())
}

/// A checkpoint with more blocks than the input is cut down to the input's count
#[tokio::test]
async fn test_translateFile_withOversizedProgress_shouldTruncateToTotal() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 3)?;
    let output = temp_dir.path().join("movie.pt.srt");
    let saved: Vec<SubtitleBlock> = (1..=4).map(common::translated_block).collect();
    ProgressFile::for_output(&output).save(&saved)?;

    let backend = MockBackend::default();
    let mut engine = engine(&backend, common::fast_engine_config());

    let outcome = engine.translate_file(&common::request(&input, &output), || false).await?;

    assert_eq!(outcome.report().translated_blocks, 3);
    assert!(backend.sent().is_empty());
    assert_eq!(output_blocks(&output).len(), 3);
    Ok(())
}

/// The model stalls just short of the total and the streak accepts the result
#[tokio::test]
async fn test_translateFile_withStallAtThreshold_shouldConvergeEarly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "long.srt", 100)?;
    let output = temp_dir.path().join("long.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(common::translated_reply(1..=99)),
        MockReply::text(common::translated_reply(98..=99)),
    ]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let outcome = engine.translate_file(&common::request(&input, &output), || false).await?;

    match outcome {
        TranslationOutcome::Completed { converged_early, report, .. } => {
            assert!(converged_early);
            assert_eq!(report.translated_blocks, 99);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(backend.sent().len(), 2);
    assert_eq!(output_blocks(&output).len(), 99);
    assert!(!ProgressFile::for_output(&output).exists());
    Ok(())
}

/// A stall well below the threshold never counts as complete
#[tokio::test]
async fn test_translateFile_withStallBelowThreshold_shouldKeepAsking() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 5)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(common::translated_reply(1..=4)),
        MockReply::text(common::translated_reply(1..=4)),
        MockReply::text(common::translated_reply(1..=4)),
        MockReply::text(common::translated_reply(1..=4)),
    ]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let result = engine.translate_file(&common::request(&input, &output), || false).await;

    // The script runs dry on the fifth request, which surfaces as a provider error
    assert!(matches!(
        result,
        Err(TranslationError::Provider(ProviderError::RequestFailed(_)))
    ));
    assert_eq!(backend.sent().len(), 5);
    assert!(!output.exists());
    let kept = ProgressFile::for_output(&output).load()?.unwrap_or_default();
    assert_eq!(kept.len(), 4);
    Ok(())
}

/// Cancelling after the first continuation keeps the checkpoint
#[tokio::test]
async fn test_translateFile_whenCancelled_shouldKeepPartialProgress() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 5)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(common::translated_reply(1..=2)),
        MockReply::text(common::translated_reply(3..=3)),
        MockReply::text(common::translated_reply(4..=5)),
    ]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let checks = AtomicUsize::new(0);
    let cancel = || checks.fetch_add(1, Ordering::SeqCst) >= 1;
    let outcome = engine.translate_file(&common::request(&input, &output), cancel).await?;

    match &outcome {
        TranslationOutcome::Cancelled(report) => assert_eq!(report.translated_blocks, 3),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert_eq!(backend.sent().len(), 2);
    assert!(!output.exists());
    let kept = ProgressFile::for_output(&output).load()?.unwrap_or_default();
    assert_eq!(kept, (1..=3).map(common::translated_block).collect::<Vec<_>>());
    Ok(())
}

/// Without checkpointing nothing is written until the output
#[tokio::test]
async fn test_translateFile_withSaveProgressDisabled_shouldNotCheckpoint() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 4)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(common::translated_reply(1..=2)),
        MockReply::text(common::translated_reply(3..=3)),
    ]);
    let config = EngineConfig { save_progress: false, ..common::fast_engine_config() };
    let mut engine = engine(&backend, config);

    let checks = AtomicUsize::new(0);
    let cancel = || checks.fetch_add(1, Ordering::SeqCst) >= 1;
    let outcome = engine.translate_file(&common::request(&input, &output), cancel).await?;

    assert!(!outcome.is_completed());
    assert!(!ProgressFile::for_output(&output).exists());
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withMissingInput_shouldFailWithInputNotFound() {
    let temp_dir = common::create_temp_dir().expect("temp dir");
    let input = temp_dir.path().join("missing.srt");
    let output = temp_dir.path().join("missing.pt.srt");

    let backend = MockBackend::default();
    let mut engine = engine(&backend, common::fast_engine_config());

    let result = engine.translate_file(&common::request(&input, &output), || false).await;

    assert!(matches!(result, Err(TranslationError::InputNotFound(path)) if path == input));
    assert!(backend.sent().is_empty());
}

/// Non-quota errors are not retried
#[tokio::test]
async fn test_translateFile_withApiError_shouldPropagateWithoutRetry() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 3)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(common::translated_reply(1..=1)),
        MockReply::ApiError { status_code: 500, message: "backend failure".to_string() },
    ]);
    let mut engine = engine(&backend, common::fast_engine_config());

    let result = engine.translate_file(&common::request(&input, &output), || false).await;

    assert!(matches!(
        result,
        Err(TranslationError::Provider(ProviderError::ApiError { status_code: 500, .. }))
    ));
    assert_eq!(backend.sent().len(), 2);
    assert_eq!(ProgressFile::for_output(&output).load()?.map(|b| b.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withEventSink_shouldReportProgress() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 4)?;
    let output = temp_dir.path().join("movie.pt.srt");

    let backend = MockBackend::with_script([
        MockReply::text(common::translated_reply(1..=2)),
        MockReply::text(common::translated_reply(3..=4)),
    ]);
    let (sink, mut receiver) = EventSink::channel();
    let mut engine = engine(&backend, common::fast_engine_config()).with_events(sink);

    engine.translate_file(&common::request(&input, &output), || false).await?;

    let mut progress = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let TranslationEvent::Progress { current, total } = event {
            progress.push((current, total));
        }
    }
    assert_eq!(progress, vec![(2, 4), (4, 4)]);
    Ok(())
}

#[test]
fn test_engineNew_withoutCredentials_shouldFail() {
    let result = TranslationEngine::new(MockBackend::default(), Vec::new(), EngineConfig::default());
    assert!(matches!(result, Err(TranslationError::Configuration(_))));
}
