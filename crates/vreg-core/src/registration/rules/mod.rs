//! Rule tables for vehicle registration field extraction.

pub mod known_names;
pub mod patterns;
pub mod shape;

pub use known_names::KnownNameCorrector;
pub use patterns::default_rules;
pub use shape::{Shaped, ShapeValidator};

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::error::ConfigError;
use crate::models::config::{Capture, RuleSpec};
use crate::models::record::Field;

/// Separator characters allowed between a label and its value.
const SEPARATOR_CLASS: &str = r"[\s:.,\-/()（）]";

/// A compiled label anchor and its capture kind.
#[derive(Debug, Clone)]
pub struct Rule {
    pub anchor: Regex,
    pub capture: Capture,
}

/// Which rule populated a field, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMatch {
    /// Field that was populated.
    pub field: Field,
    /// Accepted value.
    pub value: String,
    /// Index of the winning rule in the field's rule list.
    pub rule: usize,
    /// Line the value was read from (line-following strategy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone)]
struct FieldRules {
    rules: Vec<Rule>,
    /// Leading separators and repeated labels of this field.
    lead: Regex,
}

/// Compiled rules for all fields.
#[derive(Debug, Clone)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
    /// Any label of any field, used to bound value regions.
    any_label: Regex,
}

impl RuleSet {
    /// Compile a rule table. Fields missing from `specs` use the built-in rules.
    pub fn compile(specs: &BTreeMap<Field, Vec<RuleSpec>>) -> Result<Self, ConfigError> {
        let defaults = default_rules();
        let mut fields = Vec::with_capacity(Field::ALL.len());
        let mut all_anchors: Vec<&str> = Vec::new();

        for field in Field::ALL {
            let field_specs = specs
                .get(&field)
                .or_else(|| defaults.get(&field))
                .ok_or(ConfigError::NoRules(field))?;

            if field_specs.is_empty() {
                return Err(ConfigError::NoRules(field));
            }

            let mut rules = Vec::with_capacity(field_specs.len());
            let mut own_anchors: Vec<&str> = Vec::new();

            for spec in field_specs {
                let anchor = compile_anchor(field, &spec.anchor)?;
                if anchor.is_match("") {
                    return Err(ConfigError::InvalidValue {
                        key: format!("extraction.rules.{}", field.key()),
                        reason: format!("anchor {:?} matches empty text", spec.anchor),
                    });
                }

                rules.push(Rule {
                    anchor,
                    capture: spec.capture,
                });

                if !own_anchors.contains(&spec.anchor.as_str()) {
                    own_anchors.push(spec.anchor.as_str());
                }
            }

            let lead_source = format!(
                "^(?:{}|{})+",
                SEPARATOR_CLASS,
                own_anchors
                    .iter()
                    .map(|a| format!("(?:{})", a))
                    .collect::<Vec<_>>()
                    .join("|")
            );
            let lead = compile_anchor(field, &lead_source)?;

            for anchor in own_anchors {
                if !all_anchors.contains(&anchor) {
                    all_anchors.push(anchor);
                }
            }

            fields.push(FieldRules { rules, lead });
        }

        let any_label_source = all_anchors
            .iter()
            .map(|a| format!("(?:{})", a))
            .collect::<Vec<_>>()
            .join("|");
        let any_label = compile_anchor(Field::RegistrationMark, &any_label_source)?;

        Ok(Self { fields, any_label })
    }

    /// Rules of a field, most specific first.
    pub fn rules(&self, field: Field) -> &[Rule] {
        &self.fields[field as usize].rules
    }

    /// Value region for `field` in the text following one of its labels.
    ///
    /// Leading separators and repeated labels of the same field are
    /// skipped; the region ends at the next label of any field.
    pub fn value_region<'a>(&self, field: Field, after: &'a str) -> &'a str {
        let mut region = after;

        if let Some(m) = self.fields[field as usize].lead.find(region) {
            region = &region[m.end()..];
        }

        if let Some(m) = self.any_label.find(region) {
            region = &region[..m.start()];
        }

        region.trim()
    }

    /// Union of every label anchor.
    pub fn labels(&self) -> &Regex {
        &self.any_label
    }

    /// True if `text` starts with a label of any field.
    pub fn starts_with_label(&self, text: &str) -> bool {
        self.any_label
            .find(text.trim_start())
            .is_some_and(|m| m.start() == 0)
    }
}

fn compile_anchor(field: Field, source: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|source_err| ConfigError::InvalidAnchor {
            field,
            anchor: source.to_string(),
            source: source_err,
        })
}
