//! Text normalization for extracted page content.
//!
//! Cleans up the typographic artifacts PDF extraction leaves behind:
//! composed ligature glyphs, soft hyphens from line-break hyphenation,
//! zero-width characters, and ragged whitespace. The transform is pure
//! and idempotent; visible non-typographic content is never altered.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Composed ligature glyphs and their multi-character expansions.
const LIGATURES: &[(char, &str)] = &[
    ('\u{fb00}', "ff"),
    ('\u{fb01}', "fi"),
    ('\u{fb02}', "fl"),
    ('\u{fb03}', "ffi"),
    ('\u{fb04}', "ffl"),
    ('\u{fb05}', "ft"),
    ('\u{fb06}', "st"),
];

/// Unicode soft hyphen, used by PDFs for word breaking.
const SOFT_HYPHEN: char = '\u{00ad}';

/// Zero-width characters that carry no visible content.
const ZERO_WIDTH: &[char] = &['\u{200b}', '\u{200c}', '\u{200d}', '\u{feff}'];

fn hyphen_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-[ \t]*\n[ \t]*").unwrap())
}

fn space_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").unwrap())
}

fn blank_line_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n\s*\n+").unwrap())
}

/// Normalize extracted page text.
///
/// Steps, in fixed order: NFKC unicode normalization, ligature expansion,
/// soft-hyphen and zero-width removal, whitespace cleanup.
pub fn normalize(text: &str) -> String {
    let text: String = text.nfkc().collect();
    let text = expand_ligatures(&text);
    let text = strip_invisible(&text);
    clean_whitespace(&text)
}

fn expand_ligatures(text: &str) -> String {
    // NFKC already decomposes the Latin ligature block, so this usually
    // finds nothing; kept as a fixed table for fonts that sneak composed
    // glyphs past compatibility normalization.
    if !text.chars().any(|c| ('\u{fb00}'..='\u{fb06}').contains(&c)) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match LIGATURES.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, expansion)) => out.push_str(expansion),
            None => out.push(c),
        }
    }
    out
}

fn strip_invisible(text: &str) -> String {
    // Drop invisible characters first: a soft hyphen or zero-width
    // character sitting inside a hyphenated line break would otherwise
    // hide the break from the rejoin pattern.
    let text: String = text
        .chars()
        .filter(|c| *c != SOFT_HYPHEN && !ZERO_WIDTH.contains(c))
        .collect();
    // Rejoin words split across lines with a trailing hyphen.
    hyphen_break_re().replace_all(&text, "").into_owned()
}

fn clean_whitespace(text: &str) -> String {
    let text = space_runs_re().replace_all(text, " ");
    let text = blank_line_runs_re().replace_all(&text, "\n\n");
    let lines: Vec<&str> = text.lines().map(|line| line.trim_end()).collect();
    lines.join("\n").trim().to_string()
}
