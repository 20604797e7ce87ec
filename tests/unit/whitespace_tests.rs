/*!
 * Tests for the whitespace codec
 */

use epubtrans::whitespace::{describe, reconstruct, BreakKind};

#[test]
fn test_describe_withPlainText_shouldNormalizeWithoutBreaks() {
    let info = describe("Hello world");

    assert_eq!(info.normalized, "Hello world");
    assert!(info.breaks.is_empty());
    assert!(!info.has_paragraphs);
    assert_eq!(info.leading, "");
    assert_eq!(info.trailing, "");
    assert_eq!(info.original_length, 11);
}

#[test]
fn test_describe_withEmptyInput_shouldReturnZeroedInfo() {
    let info = describe("");

    assert_eq!(info.normalized, "");
    assert!(info.breaks.is_empty());
    assert_eq!(info.original_length, 0);
}

#[test]
fn test_describe_withWhitespaceOnlyInput_shouldNormalizeToEmpty() {
    let info = describe("   \n\t  ");

    assert_eq!(info.normalized, "");
    assert_eq!(info.original_length, 7);
}

#[test]
fn test_describe_withParagraphBreak_shouldRecordParagraph() {
    let info = describe("Alpha\n\nBeta");

    assert_eq!(info.normalized, "Alpha Beta");
    assert_eq!(info.breaks.len(), 1);
    assert_eq!(info.breaks[0].kind, BreakKind::Paragraph);
    assert_eq!(info.breaks[0].position, 5);
    assert!(info.has_paragraphs);
}

#[test]
fn test_describe_withBlankLineContainingSpaces_shouldStillBeParagraph() {
    let info = describe("Alpha\n   \nBeta");

    assert_eq!(info.breaks.len(), 1);
    assert_eq!(info.breaks[0].kind, BreakKind::Paragraph);
}

#[test]
fn test_describe_withSingleNewline_shouldRecordLineBreak() {
    let info = describe("Alpha\nBeta");

    assert_eq!(info.breaks.len(), 1);
    assert_eq!(info.breaks[0].kind, BreakKind::Line);
    assert!(!info.has_paragraphs);
}

#[test]
fn test_describe_withSurroundingWhitespace_shouldCaptureLeadingAndTrailing() {
    let info = describe("  padded  ");

    assert_eq!(info.leading, "  ");
    assert_eq!(info.trailing, "  ");
    assert_eq!(info.normalized, "padded");
}

#[test]
fn test_describe_withMultipleSpaces_shouldRecordExtraSpaceRuns() {
    let info = describe("a  b");

    assert_eq!(info.normalized, "a b");
    assert_eq!(info.extra_spaces.len(), 1);
    assert_eq!(info.extra_spaces[0].1, "  ");
}

#[test]
fn test_reconstruct_withParagraphBreak_shouldReinterleaveSegments() {
    let info = describe("Alpha\n\nBeta");
    let result = reconstruct("Coucou\n\nAmis", &info);

    assert_eq!(result, "Coucou\n\nAmis");
}

#[test]
fn test_reconstruct_withFlatTranslation_shouldStillRestoreBreakCount() {
    let info = describe("Alpha\n\nBeta");
    let result = reconstruct("Uno Dos", &info);

    // Placement is approximate; the break count is the guarantee
    assert_eq!(result.matches("\n\n").count(), 1);
    assert!(result.starts_with("Uno Dos"));
}

#[test]
fn test_reconstruct_withMultipleBreaks_shouldKeepBreakCount() {
    let info = describe("One two\n\nthree four\n\nfive six");
    let result = reconstruct("Un deux trois quatre cinq six", &info);

    assert_eq!(result.matches("\n\n").count(), 2);
    assert!(!result.contains("  "));
}

#[test]
fn test_reconstruct_withOnlyLineBreaks_shouldUseSentenceFallback() {
    // Line breaks alone don't trigger positional reinterleaving; the
    // sentence-cluster fallback applies instead
    let info = describe("Alpha\nBeta");
    let result = reconstruct("Uno Dos", &info);

    assert_eq!(result, "Uno Dos");
}

#[test]
fn test_reconstruct_withSurroundingWhitespace_shouldRestoreIt() {
    let info = describe("  padded  ");
    let result = reconstruct("traduit", &info);

    assert!(result.starts_with("  "));
    assert!(result.ends_with("  "));
}

#[test]
fn test_reconstruct_withEmptyTranslation_shouldKeepOnlySurroundingWhitespace() {
    let info = describe(" text ");
    let result = reconstruct("   ", &info);

    assert_eq!(result, "  ");
}

#[test]
fn test_reconstruct_withNoRecordedBreaks_shouldClusterSentences() {
    let info = describe("A flat run of sentences.");
    let translated = "One. Two. Three. Four. Five. Six. Seven.";
    let result = reconstruct(translated, &info);

    // Five sentences per paragraph, so seven sentences split once
    assert_eq!(result.matches("\n\n").count(), 1);
    assert!(result.starts_with("One."));
    assert!(result.ends_with("Seven."));
}

#[test]
fn test_reconstruct_withShorterTranslation_shouldClipBreakPositions() {
    let info = describe("A rather long first paragraph here\n\nand a second one");
    let result = reconstruct("Court un", &info);

    // The break survives even though the recorded position exceeds the
    // translated length
    assert_eq!(result.matches("\n\n").count(), 1);
}
