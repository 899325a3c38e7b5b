//! Field-specific shape validation of candidate values.
//!
//! A validator looks at the start of a value region and returns the value
//! it recognises there, or `None`. A value must not run straight into
//! another ASCII letter or digit: `AB12345` is not the plate `AB1234`.

use regex::Regex;

use super::patterns::{MAKE, MODEL, OWNER_LATIN, OWNER_NATIVE, REGISTRATION_MARK, YEAR};
use crate::models::record::Field;

/// Minimum engine number length.
pub const ENGINE_MIN_LENGTH: usize = 6;

/// A validated value and where it ends in its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shaped {
    pub value: String,
    /// Byte offset just past the value in the region.
    pub end: usize,
}

/// Shape validators for every field.
#[derive(Debug, Clone)]
pub struct ShapeValidator {
    chassis_min_length: usize,
}

impl ShapeValidator {
    pub fn new(chassis_min_length: usize) -> Self {
        Self { chassis_min_length }
    }

    /// Validate the start of `region` as a value of `field`.
    pub fn validate(&self, field: Field, region: &str) -> Option<Shaped> {
        match field {
            Field::RegistrationMark => leading(&REGISTRATION_MARK, region),
            Field::Make => leading(&MAKE, region),
            Field::Model => leading_words(&MODEL, region, 2),
            Field::ChassisNo => alnum_run(region, self.chassis_min_length),
            Field::EngineNo => alnum_run(region, ENGINE_MIN_LENGTH),
            Field::YearOfManufacture => leading(&YEAR, region),
            Field::Owner => {
                leading(&OWNER_NATIVE, region).or_else(|| leading_words(&OWNER_LATIN, region, 2))
            }
        }
    }
}

impl Default for ShapeValidator {
    fn default() -> Self {
        Self::new(10)
    }
}

fn runs_on(region: &str, end: usize) -> bool {
    region[end..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
}

/// Whole-token match at the start of the region.
fn leading(re: &Regex, region: &str) -> Option<Shaped> {
    let m = re.find(region)?;
    if runs_on(region, m.end()) {
        return None;
    }
    Some(Shaped {
        value: m.as_str().to_string(),
        end: m.end(),
    })
}

fn ends_word(region: &str, end: usize) -> bool {
    match region[end..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == ',' || !c.is_ascii(),
    }
}

/// Multi-word match that drops a trailing partial word instead of failing.
fn leading_words(re: &Regex, region: &str, min_len: usize) -> Option<Shaped> {
    let m = re.find(region)?;
    let mut end = m.end();

    if !ends_word(region, end) {
        end = region[..end].rfind(' ')?;
    }

    let value = region[..end].trim_end_matches([' ', ',', '-']);
    if value.chars().count() < min_len {
        return None;
    }

    Some(Shaped {
        value: value.to_string(),
        end: value.len(),
    })
}

/// Run of uppercase letters and digits of at least `min_len`.
fn alnum_run(region: &str, min_len: usize) -> Option<Shaped> {
    let end = region
        .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit()))
        .unwrap_or(region.len());

    if end < min_len || runs_on(region, end) {
        return None;
    }

    Some(Shaped {
        value: region[..end].to_string(),
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(field: Field, region: &str) -> Option<String> {
        ShapeValidator::default().validate(field, region).map(|s| s.value)
    }

    #[test]
    fn test_registration_mark() {
        assert_eq!(value(Field::RegistrationMark, "AB1234"), Some("AB1234".into()));
        assert_eq!(value(Field::RegistrationMark, "A12"), Some("A12".into()));
        assert_eq!(value(Field::RegistrationMark, "XY123Z extra"), Some("XY123Z".into()));
        assert_eq!(value(Field::RegistrationMark, "AB12345"), None);
        assert_eq!(value(Field::RegistrationMark, "ABC123"), None);
        assert_eq!(value(Field::RegistrationMark, "ab1234"), None);
        assert_eq!(value(Field::RegistrationMark, "A1"), None);
    }

    #[test]
    fn test_make_is_an_upper_case_brand() {
        assert_eq!(value(Field::Make, "HONDA 本田"), Some("HONDA".into()));
        assert_eq!(value(Field::Make, "MERCEDES-BENZ C200"), Some("MERCEDES-BENZ".into()));
        assert_eq!(value(Field::Make, "see note)"), None);
        assert_eq!(value(Field::Make, "Toyota"), None);
        assert_eq!(value(Field::Make, "HONDA2"), None);
        assert_eq!(value(Field::Make, "2019"), None);
        assert_eq!(value(Field::Make, "X"), None);
    }

    #[test]
    fn test_model() {
        assert_eq!(value(Field::Model, "COROLLA-2020"), Some("COROLLA-2020".into()));
        assert_eq!(value(Field::Model, "NZE121 1.5 G"), Some("NZE121".into()));
        assert_eq!(value(Field::Model, "ALPHARD HYBRID Body"), Some("ALPHARD HYBRID".into()));
        assert_eq!(value(Field::Model, "A"), None);
        assert_eq!(value(Field::Model, "Corolla"), None);
    }

    #[test]
    fn test_chassis_length() {
        assert_eq!(value(Field::ChassisNo, "NZE1211234567"), Some("NZE1211234567".into()));
        assert_eq!(value(Field::ChassisNo, "AB123"), None);
        assert_eq!(value(Field::ChassisNo, "NZE1211234567x"), None);

        let lenient = ShapeValidator::new(8);
        assert_eq!(
            lenient.validate(Field::ChassisNo, "NZE12112").map(|s| s.value),
            Some("NZE12112".into())
        );
    }

    #[test]
    fn test_engine_no() {
        assert_eq!(value(Field::EngineNo, "1NZ1234567"), Some("1NZ1234567".into()));
        assert_eq!(value(Field::EngineNo, "1NZ12"), None);
    }

    #[test]
    fn test_year() {
        assert_eq!(value(Field::YearOfManufacture, "2019 HONDA"), Some("2019".into()));
        assert_eq!(value(Field::YearOfManufacture, "1998"), Some("1998".into()));
        assert_eq!(value(Field::YearOfManufacture, "1850"), None);
        assert_eq!(value(Field::YearOfManufacture, "20195"), None);
    }

    #[test]
    fn test_owner() {
        assert_eq!(value(Field::Owner, "梁智聰"), Some("梁智聰".into()));
        assert_eq!(value(Field::Owner, "LEUNG, CHI CHUNG"), Some("LEUNG, CHI CHUNG".into()));
        assert_eq!(value(Field::Owner, "CHAN TAI MAN,"), Some("CHAN TAI MAN".into()));
        assert_eq!(value(Field::Owner, "Mr Chan"), None);
        assert_eq!(value(Field::Owner, "梁"), None);
    }

    #[test]
    fn test_end_offset_points_past_value() {
        let shaped = ShapeValidator::default()
            .validate(Field::YearOfManufacture, "2019 HONDA")
            .unwrap();
        assert_eq!(&"2019 HONDA"[shaped.end..], " HONDA");
    }
}
