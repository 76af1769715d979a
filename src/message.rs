//! Messages with in-band color codes.
//!
//! Chat text carries formatting as `§` followed by a code character. Rules
//! must see the text a reader sees, so a [`ColoredString`] keeps two views:
//!
//! ```text
//! raw:     "§cThis is §lSPAM."
//! plain:   "This is SPAM."
//! codes:   [(0, "§c"), (8, "§l")]      byte offset in `plain` -> codes before it
//! ```
//!
//! Edits are made against `plain`; codes keep pointing at the character they
//! preceded, so `raw()` rebuilds a colored string after any number of edits.

use regex::Regex;
use std::fmt;
use std::ops::Range;

/// Marker character that introduces a color/format code.
pub const COLOR_CHAR: char = '§';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColoredString {
    plain: String,
    /// Sorted by offset; at most one entry per offset.
    codes: Vec<(usize, String)>,
}

impl ColoredString {
    /// Split `raw` into display text and color codes.
    ///
    /// A trailing lone `§` has nothing to format and is kept as text.
    pub fn new(raw: &str) -> Self {
        let mut plain = String::with_capacity(raw.len());
        let mut codes: Vec<(usize, String)> = Vec::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c == COLOR_CHAR {
                if let Some(&code) = chars.peek() {
                    chars.next();
                    match codes.last_mut() {
                        Some((offset, existing)) if *offset == plain.len() => {
                            existing.push(c);
                            existing.push(code);
                        }
                        _ => codes.push((plain.len(), format!("{c}{code}"))),
                    }
                    continue;
                }
            }
            plain.push(c);
        }

        ColoredString { plain, codes }
    }

    /// Text without color codes. This is what rules match against.
    pub fn plain(&self) -> &str {
        &self.plain
    }

    /// Text with color codes re-inserted.
    pub fn raw(&self) -> String {
        let extra: usize = self.codes.iter().map(|(_, c)| c.len()).sum();
        let mut out = String::with_capacity(self.plain.len() + extra);
        let mut cursor = 0;
        for (offset, code) in &self.codes {
            out.push_str(&self.plain[cursor..*offset]);
            out.push_str(code);
            cursor = *offset;
        }
        out.push_str(&self.plain[cursor..]);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty()
    }

    pub fn has_codes(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Same text with every color code dropped.
    pub fn decolor(&self) -> ColoredString {
        ColoredString { plain: self.plain.clone(), codes: Vec::new() }
    }

    /// Replace a byte range of the display text.
    ///
    /// Codes inside the range collapse onto its start so the color in effect
    /// after the edit is unchanged; codes after it shift with the text.
    pub fn replace_range(&mut self, range: Range<usize>, with: &str) {
        let Range { start, end } = range;
        self.plain.replace_range(start..end, with);

        let removed = end - start;
        let mut merged: Vec<(usize, String)> = Vec::with_capacity(self.codes.len());
        for (offset, code) in self.codes.drain(..) {
            let offset = if offset <= start {
                offset
            } else if offset < end {
                start
            } else {
                offset - removed + with.len()
            };
            match merged.last_mut() {
                Some((last, existing)) if *last == offset => existing.push_str(&code),
                _ => merged.push((offset, code)),
            }
        }
        self.codes = merged;
    }

    /// Replace every match of `pattern` with the result of `f` applied to the
    /// matched text. Returns the number of replacements.
    pub fn replace_matches(&mut self, pattern: &Regex, mut f: impl FnMut(&str) -> String) -> usize {
        let spans: Vec<(Range<usize>, String)> =
            pattern.find_iter(&self.plain).map(|m| (m.range(), f(m.as_str()))).collect();

        // Back to front so earlier ranges stay valid.
        for (range, with) in spans.iter().rev() {
            self.replace_range(range.clone(), with);
        }
        spans.len()
    }
}

impl fmt::Display for ColoredString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain)
    }
}

impl From<&str> for ColoredString {
    fn from(raw: &str) -> Self {
        ColoredString::new(raw)
    }
}
