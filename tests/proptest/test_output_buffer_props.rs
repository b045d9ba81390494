//! Property-based tests for session output decoding

use proptest::prelude::*;
use rm01_switcher::session::{OutputBuffer, Pattern};

const COLORS: &[&str] = &[
    "\x1b[0m",
    "\x1b[1;32m",
    "\x1b[31m",
    "\x1b[2K",
    "\x1b]0;tio\x07",
    "\x1b(B",
    "\x1b7",
    "\x1b8",
    "\x1b=",
];

/// Feed `bytes` to a fresh buffer, split at `cuts`
fn push_split(bytes: &[u8], cuts: &[usize]) -> OutputBuffer {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|c| if bytes.is_empty() { 0 } else { c % bytes.len() })
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut buffer = OutputBuffer::new();
    let mut start = 0;
    for point in points {
        buffer.push(&bytes[start..point]);
        start = point;
    }
    buffer.push(&bytes[start..]);
    buffer
}

proptest! {
    #[test]
    fn test_plain_text_survives_any_split(
        text in "[a-zA-Z0-9 .:\\[\\]✓é\\r\\n]{0,120}",
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let buffer = push_split(text.as_bytes(), &cuts);
        prop_assert_eq!(buffer.as_str(), text.as_str());
    }

    #[test]
    fn test_colors_stripped_under_any_split(
        words in prop::collection::vec("[a-zA-Z0-9 .:✓é]{0,12}", 1..8),
        colors in prop::collection::vec(0usize..COLORS.len(), 1..8),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let mut raw = String::new();
        for (i, word) in words.iter().enumerate() {
            raw.push_str(COLORS[colors[i % colors.len()]]);
            raw.push_str(word);
        }
        let plain: String = words.concat();

        let buffer = push_split(raw.as_bytes(), &cuts);
        prop_assert_eq!(buffer.as_str(), plain.as_str());
    }

    #[test]
    fn test_completion_found_under_any_split(
        before in "[a-z .\\r\\n]{0,40}",
        after in "[a-z .\\r\\n]{0,40}",
        cuts in prop::collection::vec(any::<usize>(), 0..6),
    ) {
        let raw = format!("{}\x1b[32mForce recovery mode complete\x1b[0m{}", before, after);
        let buffer = push_split(raw.as_bytes(), &cuts);

        let pattern = Pattern::regex(rm01_switcher::config::DEFAULT_COMPLETION_PATTERN).unwrap();
        prop_assert!(pattern.find(buffer.as_str()).is_some());
    }

    #[test]
    fn test_completion_visible_when_output_stops(
        escape in 0usize..COLORS.len(),
        cuts in prop::collection::vec(any::<usize>(), 0..6),
    ) {
        let raw = format!("{}Forced recovery mode complete\r\n", COLORS[escape]);
        let buffer = push_split(raw.as_bytes(), &cuts);
        prop_assert_eq!(buffer.as_str(), "Forced recovery mode complete\r\n");
    }
}
