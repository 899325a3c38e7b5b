//! Label anchors and value shapes for Hong Kong vehicle registration documents.
//!
//! Anchors are regex sources compiled case-insensitively. Chinese labels
//! include the 登診 misreading of 登記 that OCR commonly produces.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::config::{Capture, RuleSpec};
use crate::models::record::Field;

pub const REGISTRATION_MARK_ANCHOR: &str = r"\bregistration\s*mark\b|登[記診]號碼";
pub const REGISTRATION_NO_ANCHOR: &str = r"\breg(?:istration)?\.?\s*no\b\.?|車牌號碼";
pub const MAKE_ANCHOR: &str = r"\bmake\b|製造廠名稱|製造廠|廠名";
pub const MODEL_ANCHOR: &str = r"\bmodel\b|型號";
pub const CHASSIS_ANCHOR: &str = r"\bchassis\s*(?:no\b\.?|number\b)|底盤號碼";
pub const FRAME_ANCHOR: &str = r"\bvin\b|\bframe\s*(?:no\b\.?|number\b)|車身號碼";
pub const ENGINE_ANCHOR: &str = r"\bengine\s*(?:no\b\.?|number\b)|引擎號碼";
pub const YEAR_ANCHOR: &str = r"\byear\s+of\s+manufacture\b|出廠年份|製造年份";
pub const OWNER_FULL_NAME_ANCHOR: &str = r"\bfull\s+name\s+of\s+registered\s+owner\b|登[記診]車主的全名";
pub const OWNER_ANCHOR: &str = r"\bregistered\s+owner\b|登[記診]車主(?:的全名)?|車主";

/// Built-in rule table, most specific rule first.
pub fn default_rules() -> BTreeMap<Field, Vec<RuleSpec>> {
    use Capture::*;

    BTreeMap::from([
        (
            Field::RegistrationMark,
            vec![
                RuleSpec::new(REGISTRATION_MARK_ANCHOR, Following),
                RuleSpec::new(REGISTRATION_NO_ANCHOR, Following),
            ],
        ),
        (Field::Make, vec![RuleSpec::new(MAKE_ANCHOR, Following)]),
        (Field::Model, vec![RuleSpec::new(MODEL_ANCHOR, Following)]),
        (
            Field::ChassisNo,
            vec![
                RuleSpec::new(CHASSIS_ANCHOR, Following),
                RuleSpec::new(FRAME_ANCHOR, Following),
            ],
        ),
        (Field::EngineNo, vec![RuleSpec::new(ENGINE_ANCHOR, Following)]),
        (Field::YearOfManufacture, vec![RuleSpec::new(YEAR_ANCHOR, Following)]),
        (
            Field::Owner,
            vec![
                RuleSpec::new(OWNER_FULL_NAME_ANCHOR, NextLine),
                RuleSpec::new(OWNER_FULL_NAME_ANCHOR, SameLine),
                RuleSpec::new(OWNER_ANCHOR, Following),
            ],
        ),
    ])
}

lazy_static! {
    // Hong Kong plate: 1-2 letters, 2-4 digits, optional suffix letter
    pub static ref REGISTRATION_MARK: Regex = Regex::new(
        r"^[A-Z]{1,2}\d{2,4}[A-Z]?"
    ).unwrap();

    // Upper-case brand, optionally hyphenated (MERCEDES-BENZ)
    pub static ref MAKE: Regex = Regex::new(
        r"^[A-Z]{2,}(?:-[A-Z]{2,})?"
    ).unwrap();

    pub static ref MODEL: Regex = Regex::new(
        r"^[A-Z0-9](?:[A-Z0-9\- ]*[A-Z0-9])?"
    ).unwrap();

    pub static ref YEAR: Regex = Regex::new(
        r"^(?:19|20)\d{2}"
    ).unwrap();

    pub static ref OWNER_NATIVE: Regex = Regex::new(
        r"^\p{Han}{2,}"
    ).unwrap();

    pub static ref OWNER_LATIN: Regex = Regex::new(
        r"^[A-Z][A-Z ,]*[A-Z]"
    ).unwrap();

    /// Characters skipped between a label and its value.
    pub static ref SEPARATORS: Regex = Regex::new(
        r"^[\s:.,\-/()（）]+"
    ).unwrap();
}
