//! Field descriptors and typed field values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a field within the platform's schema.
pub type FieldId = u64;

/// Identifier of a datatype (record schema).
pub type DatatypeId = u64;

/// Storage representation holding a field's value.
///
/// Serialized with the platform's type-class names (`IntegerValue`,
/// `ShortVarchar`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeClass {
    #[serde(rename = "IntegerValue")]
    Integer,
    #[serde(rename = "DecimalValue")]
    Decimal,
    #[serde(rename = "ShortVarchar")]
    ShortText,
    #[serde(rename = "MediumVarchar")]
    MediumText,
    #[serde(rename = "LongText", alias = "LongVarchar")]
    LongText,
    #[serde(rename = "DatetimeValue")]
    DateTime,
    #[serde(rename = "File")]
    File,
    #[serde(rename = "Image")]
    Image,
}

impl TypeClass {
    /// Platform name of the type-class.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "IntegerValue",
            Self::Decimal => "DecimalValue",
            Self::ShortText => "ShortVarchar",
            Self::MediumText => "MediumVarchar",
            Self::LongText => "LongText",
            Self::DateTime => "DatetimeValue",
            Self::File => "File",
            Self::Image => "Image",
        }
    }

    /// Whether values of this class compare as numbers.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IntegerValue" => Ok(Self::Integer),
            "DecimalValue" => Ok(Self::Decimal),
            "ShortVarchar" => Ok(Self::ShortText),
            "MediumVarchar" => Ok(Self::MediumText),
            "LongText" | "LongVarchar" => Ok(Self::LongText),
            "DatetimeValue" => Ok(Self::DateTime),
            "File" => Ok(Self::File),
            "Image" => Ok(Self::Image),
            other => Err(anyhow::anyhow!("Unknown field type-class '{other}'")),
        }
    }
}

/// Deserialize an optional type-class where the empty string means "none".
///
/// The platform reports a datatype without a sort field as an empty
/// type-class, in which case records sort by their own id.
pub fn deserialize_optional_type_class<'de, D>(deserializer: D) -> Result<Option<TypeClass>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => name.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A field of a datatype, as bound to a plugin role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub name: String,
    pub type_class: TypeClass,
}

/// A stored field value, tagged with its storage representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    ShortText(String),
    MediumText(String),
    LongText(String),
    DateTime(DateTime<Utc>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::ShortText(value) | Self::MediumText(value) | Self::LongText(value) => {
                f.write_str(value)
            }
            Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}
