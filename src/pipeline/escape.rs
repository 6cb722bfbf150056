//! ASCII normalisation and markup escaping.
//!
//! [`escape_to_ascii`] turns arbitrary UTF-8 into text in which every code
//! point is below 0x80, keeping as much meaning as possible and leaving
//! existing backslash commands intact.
//!
//! ## Rule Order
//!
//! Each rule runs exactly once, in this order, on the output of the previous
//! one:
//!
//! 1. Unicode space separators → ASCII space
//! 2. Curly quotes → `` `` ``, `''`, `` ` ``, `'`
//! 3. Dashes → `-`, `--`, `---`
//! 4. Ellipsis → `\ldots`
//! 5. Section / paragraph signs → `\S`, `\P`
//! 6. Symbol table → named macros
//! 7. Underscore runs of 5+ → `[BLANK]` (first pass)
//! 8. `& % $ # _ { }` escaped with a backslash unless already escaped
//! 9. Anything still outside ASCII is deleted
//! 10. Runs of 5+ underscores escaped by rule 8 → `[BLANK]` (second pass)
//!
//! The second placeholder pass runs on the ASCII-only text, so a run that is
//! only joined up by a deleted character collapses as well. It only matches
//! backslashes that rule 8 inserted; a `\_` already present in the input is
//! markup and is kept. Every rule removes its own targets from the character
//! set, which makes the whole cascade idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder written in place of long blank-filler runs.
pub const BLANK_PLACEHOLDER: &str = "[BLANK]";

/// Characters that receive a leading backslash.
const MARKUP_SPECIALS: &[char] = &['&', '%', '$', '#', '_', '{', '}'];

/// Apply the full cascade. The result is pure ASCII.
pub fn escape_to_ascii(input: &str) -> String {
    let s = normalise_spaces(input);
    let s = replace_quotes(&s);
    let s = replace_dashes(&s);
    let s = replace_ellipsis(&s);
    let s = replace_section_signs(&s);
    let s = replace_symbols(&s);
    let s = collapse_underscore_runs(&s);
    let escaped = escape_markup_specials(&s);
    let escaped = strip_non_ascii(escaped);
    collapse_escaped_underscore_runs(&escaped)
}

/// Replace every character for which `table` returns a substitute.
///
/// Substitutes that are control words (`\name`) get a separating space when
/// the next surviving character is a letter, otherwise `§a` would read as
/// `\Sa`. Characters that rule 9 will delete are looked past.
fn substitute(input: &str, table: impl Fn(char) -> Option<&'static str>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match table(c) {
            Some(rep) => {
                out.push_str(rep);
                let is_control_word = rep.starts_with('\\')
                    && rep.chars().last().is_some_and(|l| l.is_ascii_alphabetic());
                if is_control_word
                    && chars
                        .clone()
                        .find(|&n| survives(n))
                        .is_some_and(|n| n.is_ascii_alphabetic())
                {
                    out.push(' ');
                }
            }
            None => out.push(c),
        }
    }
    out
}

/// `true` when `c` reaches the output in some form. Every substitute starts
/// with a non-letter, so only ASCII letters can fuse with a control word.
fn survives(c: char) -> bool {
    c.is_ascii()
        || is_space_separator(c)
        || quote_for(c).is_some()
        || dash_for(c).is_some()
        || ellipsis_for(c).is_some()
        || section_sign_for(c).is_some()
        || symbol_for(c).is_some()
}

// ── Rule 1: Space separators ─────────────────────────────────────────────────

/// Members of the Unicode `Zs` category other than U+0020.
pub(crate) fn is_space_separator(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

fn normalise_spaces(input: &str) -> String {
    input
        .chars()
        .map(|c| if is_space_separator(c) { ' ' } else { c })
        .collect()
}

// ── Rule 2: Quotes ───────────────────────────────────────────────────────────

fn quote_for(c: char) -> Option<&'static str> {
    match c {
        '\u{201C}' => Some("``"),
        '\u{201D}' => Some("''"),
        '\u{2018}' => Some("`"),
        '\u{2019}' => Some("'"),
        _ => None,
    }
}

fn replace_quotes(input: &str) -> String {
    substitute(input, quote_for)
}

// ── Rule 3: Dashes ───────────────────────────────────────────────────────────

fn dash_for(c: char) -> Option<&'static str> {
    match c {
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2212}' => Some("-"),
        '\u{2013}' => Some("--"),
        '\u{2014}' | '\u{2015}' => Some("---"),
        _ => None,
    }
}

fn replace_dashes(input: &str) -> String {
    substitute(input, dash_for)
}

// ── Rule 4: Ellipsis ─────────────────────────────────────────────────────────

fn ellipsis_for(c: char) -> Option<&'static str> {
    (c == '\u{2026}').then_some("\\ldots")
}

fn replace_ellipsis(input: &str) -> String {
    substitute(input, ellipsis_for)
}

// ── Rule 5: Section and paragraph signs ──────────────────────────────────────

fn section_sign_for(c: char) -> Option<&'static str> {
    match c {
        '\u{00A7}' => Some("\\S"),
        '\u{00B6}' => Some("\\P"),
        _ => None,
    }
}

fn replace_section_signs(input: &str) -> String {
    substitute(input, section_sign_for)
}

// ── Rule 6: Symbols ──────────────────────────────────────────────────────────

fn symbol_for(c: char) -> Option<&'static str> {
    match c {
        '\u{00A9}' => Some("\\textcopyright"),
        '\u{00AE}' => Some("\\textregistered"),
        '\u{2122}' => Some("\\texttrademark"),
        '\u{00D7}' => Some("\\texttimes"),
        '\u{00F7}' => Some("\\textdiv"),
        '\u{00B1}' => Some("\\textpm"),
        '\u{2264}' => Some("\\leq"),
        '\u{2265}' => Some("\\geq"),
        _ => None,
    }
}

fn replace_symbols(input: &str) -> String {
    substitute(input, symbol_for)
}

// ── Rule 7: Underscore runs (before escaping) ────────────────────────────────

static RE_UNDERSCORE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{5,}").unwrap());

fn collapse_underscore_runs(input: &str) -> String {
    RE_UNDERSCORE_RUN
        .replace_all(input, BLANK_PLACEHOLDER)
        .into_owned()
}

// ── Rule 8: Markup specials ──────────────────────────────────────────────────

/// One output character of rule 8. `inserted` marks the backslashes rule 8
/// added, so rule 10 can tell them from backslashes of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Escaped {
    c: char,
    inserted: bool,
}

impl Escaped {
    fn kept(c: char) -> Self {
        Self { c, inserted: false }
    }
}

/// Escape special characters not already preceded by a backslash.
/// Backslashes themselves pass through untouched.
fn escape_markup_specials(input: &str) -> Vec<Escaped> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 8);
    let mut prev: Option<char> = None;
    for c in input.chars() {
        if MARKUP_SPECIALS.contains(&c) && prev != Some('\\') {
            out.push(Escaped {
                c: '\\',
                inserted: true,
            });
        }
        out.push(Escaped::kept(c));
        prev = Some(c);
    }
    out
}

// ── Rule 9: Hard ASCII guarantee ─────────────────────────────────────────────

fn strip_non_ascii(mut escaped: Vec<Escaped>) -> Vec<Escaped> {
    escaped.retain(|e| e.c.is_ascii());
    escaped
}

// ── Rule 10: Escaped underscore runs (after escaping) ────────────────────────

/// Number of consecutive inserted `\_` pairs starting at `at`.
fn inserted_underscore_run(escaped: &[Escaped], at: usize) -> usize {
    escaped[at..]
        .chunks_exact(2)
        .take_while(|pair| pair[0].inserted && pair[1].c == '_')
        .count()
}

fn collapse_escaped_underscore_runs(escaped: &[Escaped]) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut i = 0;
    while i < escaped.len() {
        let run = inserted_underscore_run(escaped, i);
        if run >= 5 {
            out.push_str(BLANK_PLACEHOLDER);
            i += run * 2;
        } else {
            out.push(escaped[i].c);
            i += 1;
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────
