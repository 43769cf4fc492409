//! Typing practice: per-character verdicts and the editable input buffer.
//!
//! Comparison unit is the Unicode scalar value (`char`). Typed characters past
//! the end of the reference are kept in the buffer but never judged.

/// Inserted in place of a tab keystroke.
pub const TAB_SPACES: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Untyped,
    Correct,
    Incorrect,
}

/// One verdict per character of `reference`, judged against `typed` at the same index.
pub fn diff(reference: &str, typed: &str) -> Vec<Verdict> {
    let mut typed = typed.chars();
    reference
        .chars()
        .map(|expected| match typed.next() {
            None => Verdict::Untyped,
            Some(actual) if actual == expected => Verdict::Correct,
            Some(_) => Verdict::Incorrect,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub untyped: usize,
}

impl DiffSummary {
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        verdicts
            .iter()
            .fold(Self::default(), |mut summary, verdict| {
                match verdict {
                    Verdict::Untyped => summary.untyped += 1,
                    Verdict::Correct => summary.correct += 1,
                    Verdict::Incorrect => summary.incorrect += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.untyped
    }

    pub fn is_complete(&self) -> bool {
        self.total() > 0 && self.correct == self.total()
    }

    /// Share of judged positions typed correctly, in percent. `None` before any input.
    pub fn accuracy(&self) -> Option<u8> {
        let judged = self.correct + self.incorrect;
        if judged == 0 {
            return None;
        }
        let pct = self.correct * 100 / judged;
        Some(u8::try_from(pct).unwrap_or(100))
    }
}

/// Reference text plus the reader's input, with a caret measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingState {
    reference: String,
    typed: String,
    caret: usize,
}

impl TypingState {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            typed: String::new(),
            caret: 0,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        diff(&self.reference, &self.typed)
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_verdicts(&self.verdicts())
    }

    /// Loads a new reference. Input never carries over between references.
    pub fn reset(&mut self, reference: impl Into<String>) {
        self.reference = reference.into();
        self.clear();
    }

    pub fn clear(&mut self) {
        self.typed.clear();
        self.caret = 0;
    }

    fn typed_len(&self) -> usize {
        self.typed.chars().count()
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.typed
            .char_indices()
            .nth(char_index)
            .map_or(self.typed.len(), |(offset, _)| offset)
    }

    fn splice(&mut self, text: &str) {
        let at = self.byte_offset(self.caret);
        self.typed.insert_str(at, text);
        self.caret += text.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.splice(c.encode_utf8(&mut buf));
    }

    pub fn insert_newline(&mut self) {
        self.splice("\n");
    }

    /// Splices four spaces at the caret and moves the caret past them.
    pub fn insert_tab(&mut self) {
        self.splice(TAB_SPACES);
    }

    pub fn backspace(&mut self) {
        if self.caret == 0 {
            return;
        }
        self.caret -= 1;
        let at = self.byte_offset(self.caret);
        self.typed.remove(at);
    }

    pub fn delete(&mut self) {
        if self.caret >= self.typed_len() {
            return;
        }
        let at = self.byte_offset(self.caret);
        self.typed.remove(at);
    }

    pub fn move_left(&mut self) {
        self.caret = self.caret.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.caret = (self.caret + 1).min(self.typed_len());
    }

    pub fn move_home(&mut self) {
        self.caret = 0;
    }

    pub fn move_end(&mut self) {
        self.caret = self.typed_len();
    }

    #[cfg(test)]
    fn with_input(reference: &str, typed: &str, caret: usize) -> Self {
        Self {
            reference: reference.to_string(),
            typed: typed.to_string(),
            caret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Verdict::{Correct, Incorrect, Untyped};

    #[test]
    fn mismatch_is_incorrect() {
        assert_eq!(diff("abc", "abx"), vec![Correct, Correct, Incorrect]);
    }

    #[test]
    fn missing_input_is_untyped() {
        assert_eq!(diff("abc", "ab"), vec![Correct, Correct, Untyped]);
        assert_eq!(diff("abc", ""), vec![Untyped, Untyped, Untyped]);
    }

    #[test]
    fn empty_reference_yields_nothing() {
        assert!(diff("", "").is_empty());
        assert!(diff("", "typed anyway").is_empty());
    }

    #[test]
    fn excess_input_is_not_judged() {
        assert_eq!(diff("ab", "abcdef"), vec![Correct, Correct]);
    }

    #[test]
    fn no_normalization_of_case_or_whitespace() {
        assert_eq!(diff("A b", "a\tb"), vec![Incorrect, Incorrect, Correct]);
    }

    #[test]
    fn compares_by_char_not_byte() {
        assert_eq!(diff("é;", "é;"), vec![Correct, Correct]);
        assert_eq!(diff("é;", "e;"), vec![Incorrect, Correct]);
    }

    #[test]
    fn output_tracks_reference_length_for_any_input() {
        let reference = "printf(\"%d\\n\", x);";
        let typed_cases = ["", "p", "printf", "PRINTF(\"%d\\n\", x);", "printf(\"%d\\n\", x); extra"];
        for typed in typed_cases {
            let verdicts = diff(reference, typed);
            assert_eq!(verdicts.len(), reference.chars().count());
            for (i, (verdict, expected)) in verdicts.iter().zip(reference.chars()).enumerate() {
                match typed.chars().nth(i) {
                    None => assert_eq!(*verdict, Untyped),
                    Some(actual) if actual == expected => assert_eq!(*verdict, Correct),
                    Some(_) => assert_eq!(*verdict, Incorrect),
                }
            }
        }
    }

    #[test]
    fn repeated_calls_agree() {
        assert_eq!(diff("int x;", "int y;"), diff("int x;", "int y;"));
    }

    #[test]
    fn typing_everything_then_clearing_returns_to_untyped() {
        let mut state = TypingState::new("x++;");
        for c in "x++;".chars() {
            state.insert_char(c);
        }
        assert!(state.summary().is_complete());
        state.clear();
        assert!(state.verdicts().iter().all(|v| *v == Untyped));
        assert_eq!(state.caret(), 0);
    }

    #[test]
    fn tab_splices_four_spaces_at_caret() {
        let mut state = TypingState::with_input("", "if (x)y;", 6);
        state.insert_tab();
        assert_eq!(state.typed(), "if (x)    y;");
        assert_eq!(state.caret(), 10);
    }

    #[test]
    fn tab_at_start_and_end() {
        let mut state = TypingState::new("    x");
        state.insert_tab();
        assert_eq!(state.typed(), "    ");
        assert_eq!(state.caret(), 4);
        state.insert_char('x');
        assert!(state.summary().is_complete());

        let mut state = TypingState::with_input("", "ab", 2);
        state.insert_tab();
        assert_eq!(state.typed(), "ab    ");
        assert_eq!(state.caret(), 6);
    }

    #[test]
    fn editing_around_multibyte_chars() {
        let mut state = TypingState::with_input("", "aéb", 2);
        state.backspace();
        assert_eq!(state.typed(), "ab");
        assert_eq!(state.caret(), 1);
        state.insert_char('ü');
        assert_eq!(state.typed(), "aüb");
        state.move_end();
        state.move_left();
        state.delete();
        assert_eq!(state.typed(), "aü");
        state.delete();
        assert_eq!(state.typed(), "aü");
    }

    #[test]
    fn caret_movement_is_clamped() {
        let mut state = TypingState::with_input("", "ab", 0);
        state.move_left();
        assert_eq!(state.caret(), 0);
        state.move_right();
        state.move_right();
        state.move_right();
        assert_eq!(state.caret(), 2);
        state.move_home();
        state.backspace();
        assert_eq!(state.typed(), "ab");
    }

    #[test]
    fn reset_discards_previous_input() {
        let mut state = TypingState::new("abc");
        state.insert_char('a');
        state.insert_newline();
        state.reset("xyz");
        assert_eq!(state.reference(), "xyz");
        assert_eq!(state.typed(), "");
        assert_eq!(state.caret(), 0);
    }

    #[test]
    fn summary_counts_and_accuracy() {
        let summary = DiffSummary::from_verdicts(&diff("abcd", "abx"));
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.untyped, 1);
        assert_eq!(summary.accuracy(), Some(66));
        assert!(!summary.is_complete());

        assert_eq!(DiffSummary::from_verdicts(&diff("ab", "")).accuracy(), None);
        assert!(!DiffSummary::from_verdicts(&[]).is_complete());
    }
}
