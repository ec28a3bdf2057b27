use std::convert::TryFrom;
use std::fmt;
use std::iter::FromIterator;
use std::ops::Deref;
use std::str::FromStr;

use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;
use multimap::MultiMap;
use strum::{Display, EnumString};

use crate::error::ErrorKind;
use crate::parser;

#[cfg(not(feature = "sync"))]
pub type HeaderRef = std::rc::Rc<Header>;
#[cfg(feature = "sync")]
pub type HeaderRef = std::sync::Arc<Header>;

pub type Sample = String;

/// A single attribute value, coerced at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    /// The key appeared without `=`, e.g. a flag in INFO.
    Absent,
}

impl Value {
    /// Unquoted text becomes a number if it parses to a finite one.
    pub(crate) fn coerce(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(number) if number.is_finite() => Value::Number(number),
            _ => Value::String(raw.to_owned()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number if it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() <= i64::MAX as f64)
            .map(|n| n as i64)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Absent => "missing value",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Absent => Ok(()),
        }
    }
}

/// Ordered `key[=value]` pairs as found in `<...>` header bodies and the INFO column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeList(IndexMap<String, Value>);

impl AttributeList {
    pub fn parse(input: &str, separator: char) -> Result<Self, ErrorKind> {
        parser::attribute_list(input, separator)
    }

    /// Formats the list so that parsing the result with the same separator gives back `self`.
    pub fn render(&self, separator: char) -> String {
        let mut rendered = self
            .0
            .iter()
            .map(|(key, value)| match value {
                Value::Absent => key.clone(),
                Value::Number(n) => format!("{}={}", key, n),
                Value::String(s) if !s.contains('"') => format!("{}=\"{}\"", key, s),
                Value::String(s) => format!("{}={}", key, s),
            })
            .join(&separator.to_string());
        // a trailing bare empty key would otherwise vanish
        if matches!(self.0.last(), Some((key, Value::Absent)) if key.is_empty()) {
            rendered.push(separator);
        }
        rendered
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.0.insert(key, value);
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0
    }
}

impl Deref for AttributeList {
    type Target = IndexMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<(String, Value)> for AttributeList {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        AttributeList(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum FieldType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

impl TryFrom<&Value> for FieldType {
    type Error = ErrorKind;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value
            .as_str()
            .and_then(|s| FieldType::from_str(s).ok())
            .ok_or_else(|| ErrorKind::InvalidFieldType {
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum FieldNumber {
    Count(usize),
    /// `A`: one value per alternate allele
    AlternateAlleles,
    /// `R`: one value per allele, reference included
    Alleles,
    /// `G`: one value per genotype
    Genotypes,
    /// `.`
    Unknown,
}

impl TryFrom<&Value> for FieldNumber {
    type Error = ErrorKind;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(FieldNumber::Count(*n as usize)),
            Value::String(s) => match s.as_str() {
                "A" => Ok(FieldNumber::AlternateAlleles),
                "R" => Ok(FieldNumber::Alleles),
                "G" => Ok(FieldNumber::Genotypes),
                "." => Ok(FieldNumber::Unknown),
                _ => Err(ErrorKind::InvalidFieldNumber { value: s.clone() }),
            },
            _ => Err(ErrorKind::InvalidFieldNumber {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNumber::Count(n) => write!(f, "{}", n),
            FieldNumber::AlternateAlleles => f.write_str("A"),
            FieldNumber::Alleles => f.write_str("R"),
            FieldNumber::Genotypes => f.write_str("G"),
            FieldNumber::Unknown => f.write_str("."),
        }
    }
}

/// An `##INFO` or `##FORMAT` declaration.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct FieldDeclaration {
    id: String,
    number: FieldNumber,
    kind: FieldType,
    description: String,
    source: Option<String>,
    version: Option<String>,
    /// Keys other than the ones above, e.g. `IDX`.
    additional: AttributeList,
}

pub type HeaderInfo = FieldDeclaration;
pub type HeaderFormat = FieldDeclaration;

impl TryFrom<AttributeList> for FieldDeclaration {
    type Error = ErrorKind;

    fn try_from(mut attributes: AttributeList) -> Result<Self, Self::Error> {
        for &key in &["ID", "Number", "Type", "Description"] {
            if !attributes.contains_key(key) {
                return Err(ErrorKind::MissingRequiredKey { key });
            }
        }
        let id = required_text(&mut attributes, "ID")?;
        let number = FieldNumber::try_from(&required(&mut attributes, "Number")?)?;
        let kind = FieldType::try_from(&required(&mut attributes, "Type")?)?;
        Ok(FieldDeclaration {
            id,
            number,
            kind,
            description: required_text(&mut attributes, "Description")?,
            source: optional_text(&mut attributes, "Source")?,
            version: optional_text(&mut attributes, "Version")?,
            additional: attributes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct HeaderFilter {
    id: String,
    description: String,
    source: Option<String>,
    version: Option<String>,
    additional: AttributeList,
}

impl TryFrom<AttributeList> for HeaderFilter {
    type Error = ErrorKind;

    fn try_from(mut attributes: AttributeList) -> Result<Self, Self::Error> {
        Ok(HeaderFilter {
            id: required_text(&mut attributes, "ID")?,
            description: required_text(&mut attributes, "Description")?,
            source: optional_text(&mut attributes, "Source")?,
            version: optional_text(&mut attributes, "Version")?,
            additional: attributes,
        })
    }
}

fn required(attributes: &mut AttributeList, key: &'static str) -> Result<Value, ErrorKind> {
    attributes
        .take(key)
        .ok_or(ErrorKind::MissingRequiredKey { key })
}

fn required_text(attributes: &mut AttributeList, key: &'static str) -> Result<String, ErrorKind> {
    match required(attributes, key)? {
        Value::String(s) => Ok(s),
        other => Err(ErrorKind::TypeMismatch {
            key: key.to_owned(),
            expected: "string",
            found: other.kind_name(),
        }),
    }
}

// Unquoted versions like `Version=3` are coerced to numbers by the attribute parser.
fn optional_text(
    attributes: &mut AttributeList,
    key: &'static str,
) -> Result<Option<String>, ErrorKind> {
    match attributes.take(key) {
        None => Ok(None),
        Some(Value::Absent) => Err(ErrorKind::TypeMismatch {
            key: key.to_owned(),
            expected: "string",
            found: Value::Absent.kind_name(),
        }),
        Some(value) => Ok(Some(value.to_string())),
    }
}

/// Header lines that are neither INFO, FILTER nor FORMAT.
#[derive(Debug, Clone, Default, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Extra {
    /// `##contig=<ID=...>` and friends, by header key and then by `ID`.
    pub(crate) structured: IndexMap<String, IndexMap<String, AttributeList>>,
    /// `##fileformat=VCFv4.2` and friends; repeated keys keep every value.
    pub(crate) unstructured: MultiMap<String, String>,
}

impl Extra {
    pub fn structured_entry(&self, key: &str, id: &str) -> Option<&AttributeList> {
        self.structured.get(key).and_then(|entries| entries.get(id))
    }

    pub fn unstructured_values(&self, key: &str) -> &[String] {
        self.unstructured
            .get_vec(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The parsed meta-information and column header of a VCF source.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Header {
    pub(crate) info: IndexMap<String, HeaderInfo>,
    pub(crate) filter: IndexMap<String, HeaderFilter>,
    pub(crate) format: IndexMap<String, HeaderFormat>,
    /// Sample columns after FORMAT, empty for sites-only files.
    pub(crate) samples: Vec<Sample>,
    pub(crate) extra: Extra,
}

impl Header {
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn has_samples(&self) -> bool {
        !self.samples.is_empty()
    }
}
