//! Known-name correction for the Owner field.
//!
//! Some documents carry an owner whose Latin transliteration is matched far
//! more reliably than the printed Chinese name. When both renderings of a
//! listed name appear in the same document, the native rendering wins.
//! Only full exemplars count; a surname alone never triggers a correction.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::config::KnownName;
use crate::text::NormalizedText;

lazy_static! {
    static ref COMMA_GAP: Regex = Regex::new(r"\s*,\s*").unwrap();
}

/// OCR drops or doubles the space after a comma; compare with one.
fn canonical(text: &str) -> Cow<'_, str> {
    COMMA_GAP.replace_all(text, ", ")
}

/// Table of known owner names.
#[derive(Debug, Clone, Default)]
pub struct KnownNameCorrector {
    names: Vec<KnownName>,
}

impl KnownNameCorrector {
    pub fn new(names: Vec<KnownName>) -> Self {
        Self { names }
    }

    /// Disabled corrector.
    pub fn none() -> Self {
        Self::default()
    }

    /// The native name Owner should become, if any pair fires.
    ///
    /// A pair fires when the whitespace-collapsed text contains both its
    /// Latin exemplar and its native exemplar. Spacing around commas is
    /// ignored in the Latin comparison.
    pub fn correct(&self, text: &NormalizedText) -> Option<&KnownName> {
        if self.names.is_empty() {
            return None;
        }

        let flat = text.flattened();
        let haystack = canonical(flat.as_str());

        self.names.iter().find(|pair| {
            haystack.contains(canonical(&pair.latin).as_ref()) && haystack.contains(pair.native.as_str())
        })
    }
}
