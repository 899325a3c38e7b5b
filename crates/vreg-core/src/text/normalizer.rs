//! Whitespace and line-break canonicalization of raw OCR output.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::config::AdjacencyStrategy;

lazy_static! {
    /// Two or more spaces, or a tab, inside a physical line.
    static ref LAYOUT_BREAK: Regex = Regex::new(r" {2,}|\t+").unwrap();

    static ref SPACE_RUN: Regex = Regex::new(r" +").unwrap();

    static ref BLANK_RUN: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// How line structure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationMode {
    /// Keep line breaks and turn wide gaps into new lines, so that
    /// `label    value` becomes `label\nvalue`.
    LayoutPreserving,
    /// Join everything onto a single line.
    Flatten,
}

impl From<AdjacencyStrategy> for NormalizationMode {
    fn from(strategy: AdjacencyStrategy) -> Self {
        match strategy {
            AdjacencyStrategy::LineFollowing => NormalizationMode::LayoutPreserving,
            AdjacencyStrategy::Inline => NormalizationMode::Flatten,
        }
    }
}

/// OCR text after canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
    mode: NormalizationMode,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Logical lines. A flattened text has at most one.
    pub fn lines(&self) -> Vec<&str> {
        if self.text.is_empty() {
            return Vec::new();
        }
        self.text.split('\n').collect()
    }

    /// The same text with every line break collapsed to a space.
    pub fn flattened(&self) -> NormalizedText {
        match self.mode {
            NormalizationMode::Flatten => self.clone(),
            NormalizationMode::LayoutPreserving => normalize(&self.text, NormalizationMode::Flatten),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Normalize raw OCR text. Total over all inputs.
pub fn normalize(raw: &str, mode: NormalizationMode) -> NormalizedText {
    normalize_inner(raw, mode, None)
}

/// Normalize raw OCR text, keeping every match of `labels` on one line.
///
/// In layout-preserving mode a wide gap inside a label (`Registration  Mark`)
/// is collapsed to a single space instead of starting a new line.
pub fn normalize_with_labels(raw: &str, mode: NormalizationMode, labels: &Regex) -> NormalizedText {
    normalize_inner(raw, mode, Some(labels))
}

fn normalize_inner(raw: &str, mode: NormalizationMode, labels: Option<&Regex>) -> NormalizedText {
    let canonical = canonicalize_chars(raw);

    let text = match mode {
        NormalizationMode::LayoutPreserving => {
            let lines: Vec<Cow<'_, str>> = canonical
                .split('\n')
                .map(|line| match labels {
                    Some(labels) => join_labels(line, labels),
                    None => Cow::Borrowed(line),
                })
                .collect();

            lines
                .iter()
                .flat_map(|line| LAYOUT_BREAK.split(line.as_ref()))
                .map(|segment| SPACE_RUN.replace_all(segment.trim(), " ").into_owned())
                .filter(|segment| !segment.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        }
        NormalizationMode::Flatten => canonical.split_whitespace().collect::<Vec<_>>().join(" "),
    };

    NormalizedText { text, mode }
}

fn join_labels<'a>(line: &'a str, labels: &Regex) -> Cow<'a, str> {
    labels.replace_all(line, |caps: &Captures| BLANK_RUN.replace_all(&caps[0], " ").into_owned())
}

/// Unify line endings, whitespace and full-width ASCII forms.
fn canonicalize_chars(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    unified
        .chars()
        .map(|c| match c {
            '\n' | '\t' => c,
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect()
}
