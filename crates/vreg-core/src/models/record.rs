//! Vehicle registration record model.

use std::fmt;
use std::ops::Index;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A field printed on a Hong Kong vehicle registration document.
///
/// The declaration order is the fixed column order used for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    RegistrationMark,
    Make,
    Model,
    ChassisNo,
    EngineNo,
    YearOfManufacture,
    Owner,
}

impl Field {
    /// All fields in export order.
    pub const ALL: [Field; 7] = [
        Field::RegistrationMark,
        Field::Make,
        Field::Model,
        Field::ChassisNo,
        Field::EngineNo,
        Field::YearOfManufacture,
        Field::Owner,
    ];

    /// Display label, used as output key and column header.
    pub fn label(self) -> &'static str {
        match self {
            Field::RegistrationMark => "Registration Mark",
            Field::Make => "Make",
            Field::Model => "Model",
            Field::ChassisNo => "Chassis No",
            Field::EngineNo => "Engine No",
            Field::YearOfManufacture => "Year of Manufacture",
            Field::Owner => "Owner",
        }
    }

    /// Look a field up by its display label or its snake_case key.
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Field::ALL.into_iter().find(|f| {
            f.label().eq_ignore_ascii_case(s) || f.key() == s.to_ascii_lowercase()
        })
    }

    /// snake_case key, as used in configuration files.
    pub fn key(self) -> &'static str {
        match self {
            Field::RegistrationMark => "registration_mark",
            Field::Make => "make",
            Field::Model => "model",
            Field::ChassisNo => "chassis_no",
            Field::EngineNo => "engine_no",
            Field::YearOfManufacture => "year_of_manufacture",
            Field::Owner => "owner",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Values extracted from one document.
///
/// Every field is always present; an empty string means "not found".
/// Records are built by the extractor and cannot be modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    values: [String; 7],
}

impl FieldRecord {
    /// Value of a field, empty if it was not found.
    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    /// Iterate over `(field, value)` pairs in export order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Values in export order, ready to be written as a row.
    pub fn to_row(&self) -> Vec<&str> {
        self.values.iter().map(String::as_str).collect()
    }

    /// Fields that were not found.
    pub fn missing(&self) -> Vec<Field> {
        self.iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(f, _)| f)
            .collect()
    }

    /// Number of populated fields.
    pub fn found_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_empty()).count()
    }

    /// True if no field was found.
    pub fn is_empty(&self) -> bool {
        self.found_count() == 0
    }

    pub(crate) fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }
}

impl Index<Field> for FieldRecord {
    type Output = str;

    fn index(&self, field: Field) -> &str {
        self.get(field)
    }
}

impl Serialize for FieldRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::ALL.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.label(), value)?;
        }
        map.end()
    }
}
