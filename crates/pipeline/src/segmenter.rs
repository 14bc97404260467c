//! The sentence segmenter (§4.4): a pure online function that consumes
//! incremental text fragments and yields complete sentences as soon as a
//! terminating boundary is reached.
//!
//! Adapted from the batch `split_sentences` in the teacher's
//! `crates/rag/src/chunker.rs` (grapheme-indexed scan over a fixed
//! terminator set, with a short-token abbreviation heuristic) into an
//! incremental form that retains a buffer across calls and is reset per
//! character-stream.

use unicode_segmentation::UnicodeSegmentation;

const TERMINATORS: [&str; 4] = [".", "?", "!", "।"];

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "sr", "jr", "vs", "etc", "inc", "ltd", "co", "gen",
    "capt", "sgt", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Per-character-stream segmenter state. Construct one per character reply
/// and drop it when that character's stream ends, after calling [`flush`].
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self { buffer: String::new() }
    }

    /// Feeds an incremental text fragment (an LLM token delta). Returns the
    /// complete sentences discovered as a result, in order.
    pub fn push_fragment(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);
        let mut sentences = Vec::new();
        while let Some(end) = self.find_boundary() {
            let sentence: String = self.buffer.drain(..end).collect();
            if !sentence.trim().is_empty() {
                sentences.push(sentence);
            }
        }
        sentences
    }

    /// Flushes any remaining non-terminated text as the final sentence when
    /// the character's stream closes. Returns `None` if nothing remains.
    pub fn flush(&mut self) -> Option<String> {
        let remainder = std::mem::take(&mut self.buffer);
        if remainder.trim().is_empty() {
            None
        } else {
            Some(remainder.trim().to_string())
        }
    }

    fn find_boundary(&self) -> Option<usize> {
        let graphemes: Vec<(usize, &str)> = self.buffer.grapheme_indices(true).collect();
        for (i, (byte_idx, g)) in graphemes.iter().enumerate() {
            if !TERMINATORS.contains(g) {
                continue;
            }
            let end = byte_idx + g.len();
            let preceding = &self.buffer[..*byte_idx];
            let last_word = preceding
                .rsplit(|c: char| c.is_whitespace())
                .next()
                .unwrap_or("")
                .trim_matches(|c: char| !c.is_alphanumeric());
            if *g == "." && is_abbreviation(last_word) {
                continue;
            }
            match graphemes.get(i + 1).map(|(_, g)| *g) {
                None => return Some(end),
                Some(next) if next.chars().all(char::is_whitespace) => return Some(end),
                Some("\"") | Some("'") | Some(")") | Some("”") | Some("’") => return Some(end),
                Some(next) if TERMINATORS.contains(&next) => continue,
                Some(_) => continue,
            }
        }
        None
    }
}

fn is_abbreviation(word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    if word.chars().count() == 1 {
        return true;
    }
    ABBREVIATIONS.iter().any(|a| a.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries_as_they_arrive() {
        let mut seg = SentenceSegmenter::new();
        let sentences = seg.push_fragment("Hi. How are you? Bye.");
        assert_eq!(sentences, vec!["Hi.", " How are you?", " Bye."]);
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn handles_token_by_token_streaming() {
        let mut seg = SentenceSegmenter::new();
        let mut all = Vec::new();
        for tok in ["Hi", ".", " How", " are", " you", "?", " Bye", "."] {
            all.extend(seg.push_fragment(tok));
        }
        assert_eq!(all, vec!["Hi.", " How are you?", " Bye."]);
    }

    #[test]
    fn honors_abbreviations() {
        let mut seg = SentenceSegmenter::new();
        let sentences = seg.push_fragment("Dr. Smith arrived. He left.");
        assert_eq!(sentences, vec!["Dr. Smith arrived.", " He left."]);
    }

    #[test]
    fn flushes_non_terminated_residue_on_close() {
        let mut seg = SentenceSegmenter::new();
        let sentences = seg.push_fragment("This has no ending punctuation");
        assert!(sentences.is_empty());
        assert_eq!(seg.flush().as_deref(), Some("This has no ending punctuation"));
    }

    #[test]
    fn flush_on_empty_buffer_is_none() {
        let mut seg = SentenceSegmenter::new();
        seg.push_fragment("Done.");
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn round_trip_concatenation_matches_input_modulo_trailing_whitespace() {
        let input = "Hi. How are you? Bye.";
        let mut seg = SentenceSegmenter::new();
        let mut sentences = seg.push_fragment(input);
        if let Some(rest) = seg.flush() {
            sentences.push(rest);
        }
        let reconstructed: String = sentences.concat();
        assert_eq!(reconstructed.trim_end(), input.trim_end());
    }
}
