/*!
 * Tests for batch splitting, context computation, and response splitting
 */

use subtrans::app_config::{BatcherConfig, BeforeContextMode};
use subtrans::translation::batch::{
    BatchArena, BatchStatus, clean_response, create_batches, split_translation,
};

use crate::common::make_lines;

fn config(max_lines: usize, max_chars: usize) -> BatcherConfig {
    BatcherConfig {
        max_lines_per_batch: max_lines,
        max_chars_per_batch: max_chars,
        ..BatcherConfig::default()
    }
}

#[test]
fn test_createBatches_emptyInput_returnsNoBatches() {
    let batches = create_batches(&[], &BatcherConfig::default());
    assert!(batches.is_empty());
}

#[test]
fn test_createBatches_partitionInvariant_preservesAllLines() {
    let texts: Vec<String> = (0..23).map(|i| format!("line number {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    let lines = make_lines(&refs);

    for cfg in [config(3, 10_000), config(100, 40), config(5, 60)] {
        let batches = create_batches(&lines, &cfg);

        let rejoined: Vec<&str> = batches
            .iter()
            .flat_map(|b| b.lines.iter().map(|l| l.text.as_str()))
            .collect();
        assert_eq!(rejoined, refs, "partition must reproduce the input exactly");

        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.index, i, "batch indices must be dense and ordered");
            assert!(!batch.lines.is_empty());
            assert_eq!(batch.status, BatchStatus::Pending);
        }
    }
}

#[test]
fn test_createBatches_respectsLineLimit() {
    let lines = make_lines(&["a", "b", "c", "d", "e", "f", "g"]);
    let batches = create_batches(&lines, &config(3, 10_000));

    let sizes: Vec<usize> = batches.iter().map(|b| b.lines.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn test_createBatches_respectsCharLimit() {
    let lines = make_lines(&["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);
    // Each line is 10 chars + 4 separator chars; two fit under 30, not three
    let batches = create_batches(&lines, &config(100, 30));
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].lines.len(), 2);
    assert_eq!(batches[1].lines.len(), 1);

    let cfg = config(100, 30);
    for batch in &batches {
        let used: usize = batch
            .lines
            .iter()
            .map(|l| l.text.chars().count() + cfg.line_separator.chars().count())
            .sum();
        assert!(used <= cfg.max_chars_per_batch || batch.lines.len() == 1);
    }
}

#[test]
fn test_createBatches_oversizedSingleLine_formsItsOwnBatch() {
    let long = "x".repeat(500);
    let lines = make_lines(&["short", &long, "tail"]);
    let batches = create_batches(&lines, &config(10, 50));

    assert_eq!(batches.len(), 3);
    assert_eq!(batches[1].lines.len(), 1);
    assert_eq!(batches[1].lines[0].text, long);
}

#[test]
fn test_createBatches_mergedText_joinsWithSeparator() {
    let lines = make_lines(&["one", "two"]);
    let batches = create_batches(&lines, &BatcherConfig::default());
    assert_eq!(batches[0].merged_text, "one\n%%\ntwo");
}

#[test]
fn test_computeContext_sevenLinesThreePerBatch() {
    let lines = make_lines(&["l0", "l1", "l2", "l3", "l4", "l5", "l6"]);
    let cfg = config(3, 10_000);
    let arena = BatchArena::new(create_batches(&lines, &cfg));
    assert_eq!(arena.len(), 3);

    // Batch 0: no before; after = first 2 lines of batch 1, original text
    let (before, after) = arena.compute_context(0, &cfg);
    assert_eq!(before, "");
    assert_eq!(after, "l3\nl4");

    // Batch 2: before = last 2 lines of batch 1, original until translated
    let (before, after) = arena.compute_context(2, &cfg);
    assert_eq!(before, "l4\nl5");
    assert_eq!(after, "");
}

#[test]
fn test_computeContext_prefersCompletedTranslations() {
    let lines = make_lines(&["l0", "l1", "l2", "l3", "l4", "l5", "l6"]);
    let cfg = config(3, 10_000);
    let arena = BatchArena::new(create_batches(&lines, &cfg));

    arena.update(1, |batch| {
        batch.translations = Some(vec!["t3".into(), "t4".into(), "t5".into()]);
        batch.status = BatchStatus::Completed;
    });

    let (before, _) = arena.compute_context(2, &cfg);
    assert_eq!(before, "t4\nt5");
}

#[test]
fn test_computeContext_disabledMode_leavesBeforeEmpty() {
    let lines = make_lines(&["l0", "l1", "l2", "l3"]);
    let mut cfg = config(2, 10_000);
    cfg.before_context = BeforeContextMode::Disabled;
    let arena = BatchArena::new(create_batches(&lines, &cfg));

    arena.update(0, |batch| {
        batch.translations = Some(vec!["t0".into(), "t1".into()]);
    });

    let (before, after) = arena.compute_context(1, &cfg);
    assert_eq!(before, "");
    assert_eq!(after, "");
}

#[test]
fn test_splitTranslation_roundTrip() {
    let originals = ["  Hello there ", "General Kenobi", "You are bold"];
    let response = originals.join("\n%%\n");
    let parts = split_translation(&response, 3, "\n%%\n");
    assert_eq!(parts, vec!["Hello there", "General Kenobi", "You are bold"]);
}

#[test]
fn test_splitTranslation_fallbackSeparators() {
    let response = "first\n---\nsecond\n---\nthird";
    assert_eq!(
        split_translation(response, 3, "\n%%\n"),
        vec!["first", "second", "third"]
    );

    let double_newline = "first\n\nsecond";
    assert_eq!(split_translation(double_newline, 2, "\n%%\n"), vec!["first", "second"]);

    let single_newline = "first\nsecond\nthird\nfourth";
    assert_eq!(
        split_translation(single_newline, 4, "\n%%\n"),
        vec!["first", "second", "third", "fourth"]
    );
}

#[test]
fn test_splitTranslation_tooManySegments_truncates() {
    let response = "a\n%%\nb\n%%\nc\n%%\nd";
    assert_eq!(split_translation(response, 2, "\n%%\n"), vec!["a", "b"]);
}

#[test]
fn test_splitTranslation_oneFewerSegment_padsWithOneEmpty() {
    let response = "only\n%%\ntwo";
    let parts = split_translation(response, 3, "\n%%\n");
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "only");
    assert_eq!(parts[1], "two");
    assert_eq!(parts[2], "");
}

#[test]
fn test_splitTranslation_singleLine_returnsWhole() {
    assert_eq!(split_translation("bonjour", 1, "\n%%\n"), vec!["bonjour"]);
}

#[test]
fn test_cleanResponse_stripsThinkBlocks() {
    let raw = "<think>I should translate politely.\nYes.</think>Bonjour";
    assert_eq!(clean_response(raw), "Bonjour");
}

#[test]
fn test_cleanResponse_unwrapsFencedBlocks() {
    let raw = "```text\nBonjour\n%%\nMonde\n```";
    assert_eq!(clean_response(raw), "Bonjour\n%%\nMonde");
}

#[test]
fn test_cleanResponse_plainText_unchanged() {
    assert_eq!(clean_response("  Bonjour  "), "Bonjour");
}
