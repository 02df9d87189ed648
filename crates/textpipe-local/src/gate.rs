//! The shared quality gate: one "did this work" predicate applied to every
//! strategy's attempt, independent of registry order or prior attempts.

use crate::strategies::Attempt;

/// Minimum normalized length for an attempt to count as article text.
/// Policy constant, not a behavior: override per gate or via the
/// `TEXTPIPE_MIN_CONTENT_CHARS` env knob on the default pipeline.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 80;

/// Outcome of a gate evaluation. Rejections are decisions, not errors;
/// they drive fallthrough to the next strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// The strategy reported an internal failure (already suppressed).
    StrategyFailed,
    TooShort,
    /// Tag-like markup survived normalization: the extractor leaked HTML.
    MarkupResidue,
}

impl GateDecision {
    pub fn passed(self) -> bool {
        self == GateDecision::Pass
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Pass => "pass",
            GateDecision::StrategyFailed => "strategy_failed",
            GateDecision::TooShort => "too_short",
            GateDecision::MarkupResidue => "markup_residue",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QualityGate {
    pub min_content_chars: usize,
    pub reject_markup_residue: bool,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            reject_markup_residue: true,
        }
    }
}

impl QualityGate {
    pub fn new(min_content_chars: usize) -> Self {
        Self {
            min_content_chars,
            ..Self::default()
        }
    }

    /// Pure and total: identical inputs always evaluate the same way.
    /// `cleaned` is the attempt's text after `normalize::clean`.
    pub fn decide(&self, attempt: &Attempt, cleaned: &str) -> GateDecision {
        if !attempt.succeeded {
            return GateDecision::StrategyFailed;
        }
        if cleaned.chars().count() < self.min_content_chars {
            return GateDecision::TooShort;
        }
        if self.reject_markup_residue && contains_markup(cleaned) {
            return GateDecision::MarkupResidue;
        }
        GateDecision::Pass
    }
}

/// Markup-leak probe: a `<` immediately followed by an ASCII letter, `/` or
/// `!` is the start of a tag the normalizer would have stripped had it been
/// well-formed. Plain comparisons like "a < b" do not trigger it.
pub fn contains_markup(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '<' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_alphabetic() || next == '/' || next == '!' {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use textpipe_core::ExtractionMethod;

    fn attempt(succeeded: bool, text: &str) -> Attempt {
        Attempt {
            method: ExtractionMethod::Readability,
            succeeded,
            title: None,
            text: text.to_string(),
            raw_chars: text.chars().count(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn rejects_failed_attempts_regardless_of_text() {
        let gate = QualityGate::default();
        let a = attempt(false, &"long enough text ".repeat(20));
        assert_eq!(gate.decide(&a, &a.text), GateDecision::StrategyFailed);
    }

    #[test]
    fn rejects_text_below_minimum_length() {
        let gate = QualityGate::new(40);
        let a = attempt(true, "too short");
        assert_eq!(gate.decide(&a, &a.text), GateDecision::TooShort);
        assert_eq!(gate.decide(&attempt(true, ""), ""), GateDecision::TooShort);
    }

    #[test]
    fn rejects_markup_residue() {
        let gate = QualityGate::new(10);
        let leaked = "some extracted text that still contains a <div fragment after cleaning";
        let a = attempt(true, leaked);
        assert_eq!(gate.decide(&a, leaked), GateDecision::MarkupResidue);

        let mut lenient = QualityGate::new(10);
        lenient.reject_markup_residue = false;
        assert_eq!(lenient.decide(&a, leaked), GateDecision::Pass);
    }

    #[test]
    fn passes_clean_prose_with_comparisons() {
        let gate = QualityGate::new(10);
        let text = "When n < m the loop exits early, and 3 < 5 holds for all tested inputs.";
        assert_eq!(gate.decide(&attempt(true, text), text), GateDecision::Pass);
    }

    #[test]
    fn markup_probe_matches_tag_starts_only() {
        assert!(contains_markup("x </p"));
        assert!(contains_markup("x <br"));
        assert!(contains_markup("x <!--"));
        assert!(!contains_markup("a < b"));
        assert!(!contains_markup("1<2"));
        assert!(!contains_markup("trailing <"));
    }
}
