use std::borrow::Cow;

use indexmap::IndexMap;
use log::warn;

use crate::error::{ErrorKind, Result};
use crate::record::Record;
use crate::types::{Header, Value};

pub const DEFAULT_VEP_FIELD: &str = "ANN";

const FORMAT_MARKER: &str = "Format: ";

/// One `|`-separated element of a VEP/SnpEff style INFO value, keyed by the declared field names.
pub type VepAnnotation = IndexMap<String, Value>;

/// Decodes an INFO field whose layout is declared as `... Format: A|B|C` in its description.
#[derive(Debug, Clone)]
pub struct VepParser {
    field: String,
    columns: Vec<String>,
    strict: bool,
}

impl VepParser {
    /// In non-strict mode, components that do not match the declared layout are logged and
    /// decoded as far as possible instead of failing.
    pub fn new(header: &Header, field: &str, strict: bool) -> Result<Self> {
        let info = header
            .info()
            .get(field)
            .ok_or_else(|| ErrorKind::UnknownField {
                field: field.to_owned(),
            })?;
        let (_, layout) = info
            .description()
            .split_once(FORMAT_MARKER)
            .ok_or_else(|| ErrorKind::MissingFormatSpec {
                field: field.to_owned(),
            })?;
        Ok(Self {
            field: field.to_owned(),
            columns: layout.split('|').map(str::to_owned).collect(),
            strict,
        })
    }

    /// Uses [`DEFAULT_VEP_FIELD`] in strict mode.
    pub fn from_header(header: &Header) -> Result<Self> {
        Self::new(header, DEFAULT_VEP_FIELD, true)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// The declared field names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns `None` if the record does not carry the field.
    pub fn parse(&self, record: &Record) -> Result<Option<Vec<VepAnnotation>>> {
        let value = match record.info().get(&self.field) {
            Some(value) => value,
            None => return Ok(None),
        };
        let text = match value {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Absent => {
                if self.strict {
                    return Err(self.not_a_string(value).into());
                }
                warn!("INFO field {} has no value", self.field);
                return Ok(Some(vec![]));
            }
            Value::Number(_) => {
                if self.strict {
                    return Err(self.not_a_string(value).into());
                }
                warn!("INFO field {} was not a string", self.field);
                Cow::Owned(value.to_string())
            }
        };
        text.split(',')
            .map(|element| self.annotation(element))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn annotation(&self, element: &str) -> Result<VepAnnotation> {
        let components: Vec<&str> = element.split('|').collect();
        if components.len() != self.columns.len() {
            if self.strict {
                return Err(ErrorKind::AnnotationArityMismatch {
                    expected: self.columns.len(),
                    found: components.len(),
                }
                .into());
            }
            warn!(
                "VEP format expects {} components, but the value has {}",
                self.columns.len(),
                components.len()
            );
        }
        Ok(self
            .columns
            .iter()
            .zip(components)
            .map(|(name, component)| (name.clone(), Value::coerce(component)))
            .collect())
    }

    fn not_a_string(&self, value: &Value) -> ErrorKind {
        ErrorKind::TypeMismatch {
            key: self.field.clone(),
            expected: "string",
            found: value.kind_name(),
        }
    }
}

/// Builds a [`VepParser`] for `field` and returns it as a plain function over records.
///
/// # Examples
///
/// ```
/// use rust_vcf::{vep_annotation_parser, Value, VcfRecords};
///
/// let lines = vec![
///     r#"##INFO=<ID=ANN,Number=.,Type=String,Description="Consequences. Format: Allele|Gene">"#,
///     "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
///     "chr1\t100\t.\tA\tG\t.\t.\tANN=G|GENE1,T|GENE2",
/// ];
/// let mut records = VcfRecords::new("example", lines.into_iter());
/// let header = records.meta().unwrap();
/// let annotations = vep_annotation_parser(&header, "ANN", true).unwrap();
/// let record = records.read_record().unwrap().unwrap();
/// let parsed = annotations(&record).unwrap().unwrap();
/// assert_eq!(parsed[1]["Gene"], Value::String("GENE2".into()));
/// ```
pub fn vep_annotation_parser(
    header: &Header,
    field: &str,
    strict: bool,
) -> Result<impl Fn(&Record) -> Result<Option<Vec<VepAnnotation>>>> {
    let parser = VepParser::new(header, field, strict)?;
    Ok(move |record: &Record| parser.parse(record))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::reader::VcfRecords;
    use crate::types::HeaderRef;

    const HEADER: &[&str] = &[
        r#"##INFO=<ID=ANN,Number=.,Type=String,Description="Consequence annotations from Ensembl VEP. Format: Allele|Gene|Distance">"#,
        r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Depth">"#,
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
    ];

    fn parse(info: &str) -> (HeaderRef, Record) {
        let data = format!("chr1\t100\t.\tA\tG\t.\t.\t{}", info);
        let lines = HEADER.iter().map(|&l| l.to_owned()).chain(Some(data));
        let mut records = VcfRecords::new("vep.vcf", lines);
        let header = records.meta().unwrap();
        let record = records.read_record().unwrap().unwrap();
        (header, record)
    }

    fn annotation(pairs: &[(&str, Value)]) -> VepAnnotation {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_annotations() {
        let (header, record) = parse("ANN=A|GENE1|12,B|GENE2|");
        let parser = VepParser::from_header(&header).unwrap();
        assert_eq!(parser.columns(), ["Allele", "Gene", "Distance"]);
        assert_eq!(
            parser.parse(&record).unwrap().unwrap(),
            vec![
                annotation(&[
                    ("Allele", Value::String("A".into())),
                    ("Gene", Value::String("GENE1".into())),
                    ("Distance", Value::Number(12.0)),
                ]),
                annotation(&[
                    ("Allele", Value::String("B".into())),
                    ("Gene", Value::String("GENE2".into())),
                    ("Distance", Value::String("".into())),
                ]),
            ]
        );
    }

    #[test]
    fn test_missing_field_is_not_an_error() {
        let (header, record) = parse("DP=3");
        let parser = VepParser::from_header(&header).unwrap();
        assert_eq!(parser.parse(&record).unwrap(), None);
    }

    #[test]
    fn test_build_errors() {
        let (header, _) = parse("DP=3");
        let err = VepParser::new(&header, "CSQ", true).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownField { field } if field == "CSQ"));
        let err = VepParser::new(&header, "DP", true).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingFormatSpec { .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let (header, record) = parse("ANN=A|GENE1");
        let strict = VepParser::new(&header, "ANN", true).unwrap();
        let err: Error = strict.parse(&record).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::AnnotationArityMismatch { expected: 3, found: 2 }
        ));

        let lenient = VepParser::new(&header, "ANN", false).unwrap();
        assert_eq!(
            lenient.parse(&record).unwrap().unwrap(),
            vec![annotation(&[
                ("Allele", Value::String("A".into())),
                ("Gene", Value::String("GENE1".into())),
            ])]
        );
    }

    #[test]
    fn test_non_string_value() {
        let (header, record) = parse("ANN=5");
        let err = VepParser::from_header(&header).unwrap().parse(&record).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));

        let lenient = VepParser::new(&header, "ANN", false).unwrap();
        let parsed = lenient.parse(&record).unwrap().unwrap();
        assert_eq!(parsed, vec![annotation(&[("Allele", Value::Number(5.0))])]);
    }

    #[test]
    fn test_flag_value() {
        let (header, record) = parse("ANN;DP=3");
        let err = VepParser::from_header(&header).unwrap().parse(&record).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::TypeMismatch { found: "missing value", .. }
        ));

        let lenient = VepParser::new(&header, "ANN", false).unwrap();
        assert_eq!(lenient.parse(&record).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_closure_form() {
        let (header, record) = parse("ANN=A|GENE1|1");
        let annotations = vep_annotation_parser(&header, DEFAULT_VEP_FIELD, true).unwrap();
        assert_eq!(annotations(&record).unwrap().unwrap().len(), 1);
    }
}
