//! Structural cleanup: the per-file text pipeline around the escaper.
//!
//! A [`Sanitizer`] is built once per run from the [`SanitizeConfig`] and is
//! shared read-only by every worker. Its [`Sanitizer::apply`] runs these
//! passes in a fixed order:
//!
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Strip ANSI CSI / OSC and other escape sequences, terminator included
//! 3. Remove invisible characters (BOM, zero-width, bidi controls)
//! 4. Collapse typewriter overstrikes (`x` + BACKSPACE) to a fixed point
//! 5. Remove remaining control characters except LF and TAB
//! 6. Trim trailing whitespace per line (optional)
//! 7. Collapse blank-line runs, strip leading blanks, single final newline
//!    (optional)
//! 8. Expand tabs (optional)
//! 9. [`escape_to_ascii`]
//!
//! After step 9 the whitespace policy (6 and 7) is applied once more: the
//! escaper may delete the only visible character of a line or turn a
//! trailing no-break space into a plain one, and re-settling keeps a second
//! run over the output a no-op.

use crate::config::{SanitizeConfig, TabPolicy};
use crate::pipeline::escape::escape_to_ascii;
use once_cell::sync::Lazy;
use regex::Regex;

/// The immutable per-run text transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    tabs: TabPolicy,
    trim_trailing: bool,
    collapse_blank_lines: bool,
}

impl Sanitizer {
    /// Capture the text policy of a sanitize configuration.
    pub fn new(config: &SanitizeConfig) -> Self {
        Self {
            tabs: config.tabs,
            trim_trailing: config.trim_trailing,
            collapse_blank_lines: config.collapse_blank_lines,
        }
    }

    /// Run the whole per-file text pipeline.
    pub fn apply(&self, input: &str) -> String {
        let s = normalise_line_endings(input);
        let s = strip_terminal_sequences(&s);
        let s = remove_invisible_chars(&s);
        let s = collapse_overstrikes(&s);
        let s = remove_control_chars(&s);
        let s = self.whitespace_policy(s);
        let s = match self.tabs {
            TabPolicy::Expand(width) => expand_tabs(&s, width),
            TabPolicy::Keep => s,
        };
        let s = escape_to_ascii(&s);
        self.whitespace_policy(s)
    }

    fn whitespace_policy(&self, s: String) -> String {
        let s = if self.trim_trailing {
            trim_trailing_whitespace(&s)
        } else {
            s
        };
        if self.collapse_blank_lines {
            collapse_blank_lines(&s)
        } else {
            s
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&SanitizeConfig::default())
    }
}

// ── Rule 1: Line endings ─────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Terminal escape sequences ────────────────────────────────────────

// OSC (BEL or ST terminated), CSI, charset designation, then any other
// two-byte escape. Alternation is leftmost-first, so the long forms win.
static RE_TERMINAL_SEQ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b\[[0-?]*[ -/]*[@-~]|\x1b[()#][0-9A-Za-z]|\x1b[@-Z\\-_]",
    )
    .unwrap()
});

fn strip_terminal_sequences(input: &str) -> String {
    RE_TERMINAL_SEQ.replace_all(input, "").into_owned()
}

// ── Rule 3: Invisible characters ─────────────────────────────────────────────

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{FEFF}'
            | '\u{200B}'
            | '\u{200C}'
            | '\u{200D}'
            | '\u{2060}'
            | '\u{00AD}'
            | '\u{061C}'
            | '\u{200E}'
            | '\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
    )
}

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !is_invisible(*c)).collect()
}

// ── Rule 4: Overstrikes ──────────────────────────────────────────────────────

/// Delete every `x` BACKSPACE pair until none remain.
///
/// A stack reaches the same fixed point in one pass: each backspace cancels
/// the nearest surviving character on its line. A backspace with nothing to
/// cancel is left for rule 5.
fn collapse_overstrikes(input: &str) -> String {
    if !input.contains('\u{8}') {
        return input.to_string();
    }
    let mut out: Vec<char> = Vec::with_capacity(input.len());
    for c in input.chars() {
        if c == '\u{8}' {
            match out.last() {
                Some(&prev) if prev != '\n' && prev != '\u{8}' => {
                    out.pop();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out.into_iter().collect()
}

// ── Rule 5: Control characters ───────────────────────────────────────────────

fn remove_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect()
}

// ── Rule 6: Trailing whitespace ──────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Blank lines ──────────────────────────────────────────────────────

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Runs of 3+ blank lines become one blank line, leading blank lines are
/// dropped and the text ends with exactly one newline. Empty stays empty.
fn collapse_blank_lines(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let Some(start) = lines.iter().position(|l| !is_blank(l)) else {
        return String::new();
    };
    let end = lines.iter().rposition(|l| !is_blank(l)).unwrap_or(start);

    let mut out = String::with_capacity(input.len());
    let mut i = start;
    while i <= end {
        if !is_blank(lines[i]) {
            out.push_str(lines[i]);
            out.push('\n');
            i += 1;
            continue;
        }
        let run_start = i;
        while i <= end && is_blank(lines[i]) {
            i += 1;
        }
        if i - run_start >= 3 {
            out.push('\n');
        } else {
            for line in &lines[run_start..i] {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out
}

// ── Rule 8: Tabs ─────────────────────────────────────────────────────────────

fn expand_tabs(input: &str, width: usize) -> String {
    if !input.contains('\t') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 16);
    let mut col = 0usize;
    for c in input.chars() {
        match c {
            '\t' => {
                let n = width - (col % width);
                out.extend(std::iter::repeat_n(' ', n));
                col += n;
            }
            '\n' => {
                out.push(c);
                col = 0;
            }
            _ => {
                out.push(c);
                col += 1;
            }
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer(tabs: TabPolicy, trim: bool, collapse: bool) -> Sanitizer {
        Sanitizer {
            tabs,
            trim_trailing: trim,
            collapse_blank_lines: collapse,
        }
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_csi_and_osc() {
        let input = "\x1b[1;31mred\x1b[0m \x1b]0;title\x07done \x1b]8;;http://x\x1b\\link";
        assert_eq!(strip_terminal_sequences(input), "red done link");
    }

    #[test]
    fn test_strip_cursor_moves() {
        assert_eq!(strip_terminal_sequences("a\x1b[2Kb\x1b[?25lc\x1b(Bd"), "abcd");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "\u{FEFF}hello\u{200B}wor\u{200D}ld\u{202E}!\u{2066}";
        assert_eq!(remove_invisible_chars(input), "helloworld!");
    }

    #[test]
    fn test_overstrike_single_pair() {
        assert_eq!(collapse_overstrikes("ab\u{8}c"), "ac");
    }

    #[test]
    fn test_overstrike_chain_reaches_fixed_point() {
        assert_eq!(collapse_overstrikes("abc\u{8}\u{8}d"), "ad");
        assert_eq!(collapse_overstrikes("_\u{8}A_\u{8}B"), "AB");
    }

    #[test]
    fn test_overstrike_does_not_cross_lines() {
        let out = collapse_overstrikes("a\n\u{8}b");
        assert_eq!(remove_control_chars(&out), "a\nb");
    }

    #[test]
    fn test_remove_control_chars_keeps_lf_and_tab() {
        assert_eq!(remove_control_chars("a\u{0}b\u{7}\tc\u{c}\nd\u{7f}\u{85}"), "ab\tc\nd");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  hello \t\nworld  \n"), "  hello\nworld\n");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb\n");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\n\nb\n");
        assert_eq!(collapse_blank_lines("\n\n\na\n\n\n\n"), "a\n");
        assert_eq!(collapse_blank_lines("a"), "a\n");
        assert_eq!(collapse_blank_lines(""), "");
        assert_eq!(collapse_blank_lines("\n \n"), "");
    }

    #[test]
    fn test_expand_tabs_to_columns() {
        assert_eq!(expand_tabs("a\tb", 4), "a   b");
        assert_eq!(expand_tabs("abcd\tb", 4), "abcd    b");
        assert_eq!(expand_tabs("\tx\n\ty", 2), "  x\n  y");
    }

    #[test]
    fn test_keep_tabs() {
        let s = sanitizer(TabPolicy::Keep, true, true);
        assert_eq!(s.apply("a\tb\n"), "a\tb\n");
    }

    #[test]
    fn test_full_pipeline() {
        let s = Sanitizer::default();
        let input = "\u{FEFF}\r\n\r\nTitle\u{00A0}\u{00A0}\r\n\x1b[1mBold\x1b[0m\t50%\r\n\n\n\n\nEnd\u{2026}";
        assert_eq!(s.apply(input), "Title\nBold    50\\%\n\nEnd\\ldots\n");
    }

    #[test]
    fn test_full_pipeline_is_idempotent() {
        let s = Sanitizer::default();
        let inputs = [
            "line \u{1F600}\nnext\u{00A0}\n\u{4E2D}\n\u{4E2D}\n\u{4E2D}\nend",
            "\t\u{201C}x\u{201D}\t\n\n\n\n__\u{00E9}___",
            "plain\n",
            "",
        ];
        for input in inputs {
            let once = s.apply(input);
            assert_eq!(s.apply(&once), once, "not idempotent for {input:?}");
            assert!(once.is_ascii());
        }
    }

    #[test]
    fn test_policies_off_leave_layout_alone() {
        let s = sanitizer(TabPolicy::Keep, false, false);
        assert_eq!(s.apply("a  \n\n\n\n\tb"), "a  \n\n\n\n\tb");
    }
}
