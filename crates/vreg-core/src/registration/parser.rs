//! Rule-driven parser for vehicle registration documents.

use lazy_static::lazy_static;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::models::config::{AdjacencyStrategy, Capture, ExtractionConfig, KnownName};
use crate::models::record::{Field, FieldRecord};
use crate::text::{normalize_with_labels, NormalizationMode, NormalizedText};

use super::rules::patterns::SEPARATORS;
use super::rules::{default_rules, FieldMatch, KnownNameCorrector, RuleSet, ShapeValidator};
use super::RecordExtractor;

lazy_static! {
    static ref DEFAULT_RULE_SET: RuleSet = RuleSet::compile(&default_rules()).unwrap();
}

/// A correction applied after the primary pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Adjustment {
    /// Make was read from the Year of Manufacture line.
    MakeFromYearLine { make: String },
    /// Owner was replaced by the native rendering of a known name.
    KnownName {
        latin: String,
        native: String,
        replaced: String,
    },
}

/// Result of parsing one document.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted values.
    pub record: FieldRecord,
    /// Text the rules ran against.
    pub text: NormalizedText,
    /// Matches from the primary pass.
    pub matches: Vec<FieldMatch>,
    /// Corrections applied after the primary pass.
    pub adjustments: Vec<Adjustment>,
}

impl ExtractionResult {
    /// Fields that stayed empty.
    pub fn missing(&self) -> Vec<Field> {
        self.record.missing()
    }

    /// Primary-pass match for a field.
    pub fn match_for(&self, field: Field) -> Option<&FieldMatch> {
        self.matches.iter().find(|m| m.field == field)
    }
}

/// Trait for registration document parsing.
pub trait RegistrationParser {
    /// Parse raw OCR text. Never fails; missing fields are empty.
    fn parse(&self, text: &str) -> ExtractionResult;
}

/// A validated value plus the rest of its region.
struct Hit {
    value: String,
    rest: String,
    rule: usize,
    line: Option<usize>,
}

/// Field extractor driven by a prioritized rule table per field.
#[derive(Debug, Clone)]
pub struct VehicleExtractor {
    strategy: AdjacencyStrategy,
    rules: RuleSet,
    shapes: ShapeValidator,
    make_from_year_line: bool,
    corrector: KnownNameCorrector,
}

impl VehicleExtractor {
    /// Create an extractor with the built-in rules and default settings.
    pub fn new() -> Self {
        let defaults = ExtractionConfig::default();
        Self {
            strategy: defaults.strategy,
            rules: DEFAULT_RULE_SET.clone(),
            shapes: ShapeValidator::new(defaults.chassis_min_length),
            make_from_year_line: defaults.make_from_year_line,
            corrector: KnownNameCorrector::new(defaults.known_names),
        }
    }

    /// Create an extractor from configuration, compiling its rules.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let corrector = if config.known_name_correction {
            KnownNameCorrector::new(config.known_names.clone())
        } else {
            KnownNameCorrector::none()
        };

        Ok(Self {
            strategy: config.strategy,
            rules: RuleSet::compile(&config.rules)?,
            shapes: ShapeValidator::new(config.chassis_min_length),
            make_from_year_line: config.make_from_year_line,
            corrector,
        })
    }

    /// Set the adjacency strategy.
    pub fn with_strategy(mut self, strategy: AdjacencyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the minimum chassis number length.
    pub fn with_chassis_min_length(mut self, length: usize) -> Self {
        self.shapes = ShapeValidator::new(length);
        self
    }

    /// Enable or disable reading Make from the Year of Manufacture line.
    pub fn with_make_from_year_line(mut self, enabled: bool) -> Self {
        self.make_from_year_line = enabled;
        self
    }

    /// Replace the known-name table. An empty table disables correction.
    pub fn with_known_names(mut self, names: Vec<KnownName>) -> Self {
        self.corrector = KnownNameCorrector::new(names);
        self
    }

    pub fn strategy(&self) -> AdjacencyStrategy {
        self.strategy
    }

    /// Normalize raw text the way this extractor's strategy expects.
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        normalize_with_labels(raw, NormalizationMode::from(self.strategy), self.rules.labels())
    }

    /// Run the rules over already normalized text.
    pub fn extract_normalized(&self, text: &NormalizedText) -> ExtractionResult {
        let mut record = FieldRecord::default();
        let mut matches = Vec::new();
        let mut adjustments = Vec::new();
        let mut year_rest = None;

        for field in Field::ALL {
            let Some(hit) = self.find_field(field, text) else {
                continue;
            };

            debug!(field = %field, value = %hit.value, rule = hit.rule, "matched field");

            if field == Field::YearOfManufacture {
                year_rest = Some(hit.rest.clone());
            }

            record.set(field, hit.value.as_str());
            matches.push(FieldMatch {
                field,
                value: hit.value,
                rule: hit.rule,
                line: hit.line,
            });
        }

        if self.make_from_year_line && record.get(Field::Make).is_empty() {
            if let Some(make) = year_rest.as_deref().and_then(|rest| self.make_from_year_rest(rest)) {
                debug!(make = %make, "make read from year of manufacture line");
                record.set(Field::Make, make.as_str());
                adjustments.push(Adjustment::MakeFromYearLine { make });
            }
        }

        if let Some(pair) = self.corrector.correct(text) {
            let current = record.get(Field::Owner);
            if current != pair.native {
                debug!(native = %pair.native, "owner replaced by known name");
                adjustments.push(Adjustment::KnownName {
                    latin: pair.latin.clone(),
                    native: pair.native.clone(),
                    replaced: current.to_string(),
                });
                record.set(Field::Owner, pair.native.as_str());
            }
        }

        ExtractionResult {
            record,
            text: text.clone(),
            matches,
            adjustments,
        }
    }

    fn find_field(&self, field: Field, text: &NormalizedText) -> Option<Hit> {
        match self.strategy {
            AdjacencyStrategy::LineFollowing => self.find_in_lines(field, &text.lines()),
            AdjacencyStrategy::Inline => self.find_inline(field, text.as_str()),
        }
    }

    /// Label on line N; value after the label on line N and/or on line N+1.
    fn find_in_lines(&self, field: Field, lines: &[&str]) -> Option<Hit> {
        for (rule_index, rule) in self.rules.rules(field).iter().enumerate() {
            for (idx, line) in lines.iter().enumerate() {
                let Some(m) = rule.anchor.find(line) else {
                    continue;
                };

                let same_line = Some((idx, &line[m.end()..]));
                let next_line = lines.get(idx + 1).map(|next| (idx + 1, *next));

                let candidates = match rule.capture {
                    Capture::Following => [same_line, next_line],
                    Capture::SameLine => [same_line, None],
                    Capture::NextLine => [next_line, None],
                };

                for (line_no, after) in candidates.into_iter().flatten() {
                    if let Some(hit) = self.try_region(field, after, rule_index, Some(line_no)) {
                        return Some(hit);
                    }
                }
            }
        }
        None
    }

    /// Label anywhere in flattened text; value is what follows it.
    fn find_inline(&self, field: Field, text: &str) -> Option<Hit> {
        for (rule_index, rule) in self.rules.rules(field).iter().enumerate() {
            for m in rule.anchor.find_iter(text) {
                if let Some(hit) = self.try_region(field, &text[m.end()..], rule_index, None) {
                    return Some(hit);
                }
            }
        }
        None
    }

    fn try_region(&self, field: Field, after: &str, rule: usize, line: Option<usize>) -> Option<Hit> {
        let region = self.rules.value_region(field, after);
        if region.is_empty() {
            return None;
        }

        let shaped = self.shapes.validate(field, region)?;
        Some(Hit {
            value: shaped.value,
            rest: region[shaped.end..].to_string(),
            rule,
            line,
        })
    }

    fn make_from_year_rest(&self, rest: &str) -> Option<String> {
        let rest = SEPARATORS.replace(rest, "");
        self.shapes
            .validate(Field::Make, rest.trim_end())
            .map(|shaped| shaped.value)
    }
}

impl Default for VehicleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationParser for VehicleExtractor {
    fn parse(&self, text: &str) -> ExtractionResult {
        let normalized = self.normalize(text);
        info!(
            "Parsing registration document from {} characters of text",
            text.len()
        );

        let result = self.extract_normalized(&normalized);

        debug!(
            found = result.record.found_count(),
            missing = ?result.missing(),
            "extraction finished"
        );

        result
    }
}

impl RecordExtractor for VehicleExtractor {
    fn extract(&self, text: &str) -> FieldRecord {
        self.parse(text).record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL_DOCUMENT: &str = "\
VEHICLE REGISTRATION DOCUMENT 車輛登記文件
Registration Mark 登記號碼
AB1234
Make 廠名
TOYOTA
Model 型號
COROLLA-2020
Chassis No. 底盤號碼
NZE1211234567
Engine No. 引擎號碼
1NZ1234567
Year of Manufacture 出廠年份
2019
Full Name of Registered Owner 登記車主的全名
CHAN TAI MAN
";

    fn both_strategies() -> [VehicleExtractor; 2] {
        [
            VehicleExtractor::new(),
            VehicleExtractor::new().with_strategy(AdjacencyStrategy::Inline),
        ]
    }

    fn record(pairs: &[(Field, &str)]) -> FieldRecord {
        let mut record = FieldRecord::default();
        for (field, value) in pairs {
            record.set(*field, *value);
        }
        record
    }

    #[test]
    fn test_scenario_label_then_value_lines() {
        let text = "Registration Mark\nAB1234\nMake\nTOYOTA\nModel\nCOROLLA-2020\n";
        let expected = record(&[
            (Field::RegistrationMark, "AB1234"),
            (Field::Make, "TOYOTA"),
            (Field::Model, "COROLLA-2020"),
        ]);

        for extractor in both_strategies() {
            assert_eq!(extractor.extract(text), expected);
        }
    }

    #[test]
    fn test_scenario_make_from_year_line() {
        let text = "Year of Manufacture 2019 HONDA";

        for extractor in both_strategies() {
            let result = extractor.parse(text);
            assert_eq!(result.record.get(Field::YearOfManufacture), "2019");
            assert_eq!(result.record.get(Field::Make), "HONDA");
            assert_eq!(
                result.adjustments,
                vec![Adjustment::MakeFromYearLine { make: "HONDA".to_string() }]
            );
        }
    }

    #[test]
    fn test_make_from_year_line_can_be_disabled() {
        let extractor = VehicleExtractor::new().with_make_from_year_line(false);
        let record = extractor.extract("Year of Manufacture 2019 HONDA");
        assert_eq!(record.get(Field::YearOfManufacture), "2019");
        assert_eq!(record.get(Field::Make), "");
    }

    #[test]
    fn test_labelled_make_wins_over_year_line() {
        let record = VehicleExtractor::new().extract("Make\nLEXUS\nYear of Manufacture 2019 HONDA");
        assert_eq!(record.get(Field::Make), "LEXUS");
    }

    #[test]
    fn test_scenario_known_name() {
        let text = "Full Name of Registered Owner\nLEUNG, CHI CHUNG\n梁智聰";

        for extractor in both_strategies() {
            let result = extractor.parse(text);
            assert_eq!(result.record.get(Field::Owner), "梁智聰");
            assert!(matches!(
                result.adjustments.as_slice(),
                [Adjustment::KnownName { replaced, .. }] if replaced == "LEUNG, CHI CHUNG"
            ));
        }
    }

    #[test]
    fn test_known_name_without_owner_label() {
        let record = VehicleExtractor::new().extract("remarks LEUNG, CHI CHUNG 梁智聰 stamp");
        assert_eq!(record.get(Field::Owner), "梁智聰");
    }

    #[test]
    fn test_known_name_needs_both_renderings() {
        let extractor = VehicleExtractor::new();

        let record = extractor.extract("Registered Owner\nLEUNG, CHI CHUNG");
        assert_eq!(record.get(Field::Owner), "LEUNG, CHI CHUNG");

        let record = extractor.extract("Registered Owner\nCHAN TAI MAN\n梁智聰");
        assert_eq!(record.get(Field::Owner), "CHAN TAI MAN");

        let record = extractor.extract("梁智聰");
        assert_eq!(record.get(Field::Owner), "");
    }

    #[test]
    fn test_known_name_correction_disabled() {
        let mut config = ExtractionConfig::default();
        config.known_name_correction = false;
        let extractor = VehicleExtractor::from_config(&config).unwrap();

        let record = extractor.extract("Registered Owner\nLEUNG, CHI CHUNG\n梁智聰");
        assert_eq!(record.get(Field::Owner), "LEUNG, CHI CHUNG");
    }

    #[test]
    fn test_scenario_empty_input() {
        for extractor in both_strategies() {
            let result = extractor.parse("");
            assert!(result.record.is_empty());
            assert_eq!(result.missing(), Field::ALL.to_vec());
            assert!(result.adjustments.is_empty());
        }
    }

    #[test]
    fn test_garbage_input() {
        for extractor in both_strategies() {
            assert!(extractor.extract("@@## ~~ 12 \u{0} ｜｜ \n\n ::: model make").is_empty());
        }
    }

    #[test]
    fn test_full_document() {
        let expected = record(&[
            (Field::RegistrationMark, "AB1234"),
            (Field::Make, "TOYOTA"),
            (Field::Model, "COROLLA-2020"),
            (Field::ChassisNo, "NZE1211234567"),
            (Field::EngineNo, "1NZ1234567"),
            (Field::YearOfManufacture, "2019"),
            (Field::Owner, "CHAN TAI MAN"),
        ]);

        for extractor in both_strategies() {
            assert_eq!(extractor.extract(FULL_DOCUMENT), expected);
        }
    }

    #[test]
    fn test_missing_label_only_empties_its_field() {
        let labels = [
            (Field::RegistrationMark, "Registration Mark 登記號碼\nAB1234\n"),
            (Field::Make, "Make 廠名\nTOYOTA\n"),
            (Field::Model, "Model 型號\nCOROLLA-2020\n"),
            (Field::ChassisNo, "Chassis No. 底盤號碼\nNZE1211234567\n"),
            (Field::EngineNo, "Engine No. 引擎號碼\n1NZ1234567\n"),
            (Field::YearOfManufacture, "Year of Manufacture 出廠年份\n2019\n"),
            (Field::Owner, "Full Name of Registered Owner 登記車主的全名\nCHAN TAI MAN\n"),
        ];
        let full = VehicleExtractor::new().extract(FULL_DOCUMENT);

        for (removed, _) in labels {
            let text: String = labels
                .iter()
                .filter(|(field, _)| *field != removed)
                .map(|(_, block)| *block)
                .collect();

            for extractor in both_strategies() {
                let record = extractor.extract(&text);
                for field in Field::ALL {
                    let expected = if field == removed { "" } else { full.get(field) };
                    assert_eq!(record.get(field), expected, "removed {removed}, checking {field}");
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        for extractor in both_strategies() {
            let text = extractor.normalize(FULL_DOCUMENT);
            let first = extractor.extract_normalized(&text);
            let second = extractor.extract_normalized(&text);
            assert_eq!(first.record, second.record);
            assert_eq!(first.matches, second.matches);
        }
    }

    #[test]
    fn test_shape_validation_rejects_false_positives() {
        let text = "Chassis No.\nAB123\nYear of Manufacture\n1850\nRegistration Mark\nABC12345";
        for extractor in both_strategies() {
            let record = extractor.extract(text);
            assert_eq!(record.get(Field::ChassisNo), "");
            assert_eq!(record.get(Field::YearOfManufacture), "");
            assert_eq!(record.get(Field::RegistrationMark), "");
        }
    }

    #[test]
    fn test_chinese_label_is_equivalent() {
        for extractor in both_strategies() {
            assert_eq!(
                extractor.extract("登記號碼\nAB1234").get(Field::RegistrationMark),
                "AB1234"
            );
            assert_eq!(
                extractor.extract("Registration Mark\nAB1234").get(Field::RegistrationMark),
                "AB1234"
            );
            assert_eq!(extractor.extract("登記號碼\nAB12345").get(Field::RegistrationMark), "");
            assert_eq!(
                extractor.extract("Registration Mark\nAB12345").get(Field::RegistrationMark),
                ""
            );
        }
    }

    #[test]
    fn test_case_insensitive_labels() {
        let record = VehicleExtractor::new().extract("REGISTRATION MARK\nXY88\nengine no.\nABC12345");
        assert_eq!(record.get(Field::RegistrationMark), "XY88");
        assert_eq!(record.get(Field::EngineNo), "ABC12345");
    }

    #[test]
    fn test_value_on_label_line() {
        let record = VehicleExtractor::new()
            .extract("Registration Mark: AB1234\nChassis No. 底盤號碼 NZE1211234567\n出廠年份：2019");
        assert_eq!(record.get(Field::RegistrationMark), "AB1234");
        assert_eq!(record.get(Field::ChassisNo), "NZE1211234567");
        assert_eq!(record.get(Field::YearOfManufacture), "2019");
    }

    #[test]
    fn test_wide_gaps_split_label_and_value() {
        let record = VehicleExtractor::new().extract("Make      TOYOTA      Model      PRIUS");
        assert_eq!(record.get(Field::Make), "TOYOTA");
        assert_eq!(record.get(Field::Model), "PRIUS");
    }

    #[test]
    fn test_wide_gaps_inside_labels() {
        let text = "Registration  Mark\nAB1234\nYear of  Manufacture 2019 HONDA";

        for extractor in both_strategies() {
            let record = extractor.extract(text);
            assert_eq!(record.get(Field::RegistrationMark), "AB1234");
            assert_eq!(record.get(Field::YearOfManufacture), "2019");
            assert_eq!(record.get(Field::Make), "HONDA");
        }
    }

    #[test]
    fn test_annotation_after_label_does_not_hide_next_line() {
        let record = VehicleExtractor::new().extract("Make 廠名 (see note)\nTOYOTA\nModel 型號\nCOROLLA-2020");
        assert_eq!(record.get(Field::Make), "TOYOTA");
        assert_eq!(record.get(Field::Model), "COROLLA-2020");
    }

    #[test]
    fn test_next_label_is_not_a_value() {
        let record = VehicleExtractor::new().extract("Make\nModel\nCOROLLA");
        assert_eq!(record.get(Field::Make), "");
        assert_eq!(record.get(Field::Model), "COROLLA");
    }

    #[test]
    fn test_first_validated_candidate_wins() {
        let result = VehicleExtractor::new().parse("Registration Mark\n12 MAR 2020\nReg. No.\nKT888");
        assert_eq!(result.record.get(Field::RegistrationMark), "KT888");
        assert_eq!(result.match_for(Field::RegistrationMark).map(|m| m.rule), Some(1));
        assert_eq!(result.match_for(Field::RegistrationMark).and_then(|m| m.line), Some(3));
    }

    #[test]
    fn test_chassis_min_length_is_configurable() {
        let text = "Chassis No.\nAB123456";
        assert_eq!(VehicleExtractor::new().extract(text).get(Field::ChassisNo), "");
        assert_eq!(
            VehicleExtractor::new()
                .with_chassis_min_length(8)
                .extract(text)
                .get(Field::ChassisNo),
            "AB123456"
        );
    }

    #[test]
    fn test_custom_rules_from_config() {
        let mut config = ExtractionConfig::default();
        config.rules.insert(
            Field::Make,
            vec![crate::models::config::RuleSpec::new(r"\bmanufacturer\b", Capture::NextLine)],
        );
        let extractor = VehicleExtractor::from_config(&config).unwrap();

        assert_eq!(extractor.extract("Manufacturer\nNISSAN").get(Field::Make), "NISSAN");
        assert_eq!(extractor.extract("Make\nNISSAN").get(Field::Make), "");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ExtractionConfig::default();
        config.chassis_min_length = 30;
        assert!(VehicleExtractor::from_config(&config).is_err());
    }
}
