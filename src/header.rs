use std::convert::TryFrom;
use std::mem;

use indexmap::IndexMap;
use log::trace;

use crate::error::ErrorKind;
use crate::parser::{self, MetaLine};
use crate::types::{AttributeList, Extra, Header, HeaderFilter, HeaderFormat, HeaderInfo, Sample};

/// Accumulates meta lines until the `#CHROM` line turns them into a [`Header`].
#[derive(Debug, Default)]
pub(crate) struct HeaderBuilder {
    info: IndexMap<String, HeaderInfo>,
    filter: IndexMap<String, HeaderFilter>,
    format: IndexMap<String, HeaderFormat>,
    extra: Extra,
}

impl HeaderBuilder {
    /// Returns the finished header once the column header line has been consumed.
    pub(crate) fn consume(&mut self, line: &str) -> Result<Option<Header>, ErrorKind> {
        match parser::meta_line(line)? {
            MetaLine::Structured { key, attributes } => self.declare(key, attributes)?,
            MetaLine::Unstructured { key, value } => {
                self.extra
                    .unstructured
                    .insert(key.to_owned(), value.to_owned());
            }
            MetaLine::ColumnHeader { samples } => return Ok(Some(self.finish(samples))),
            MetaLine::Comment => trace!("skipping comment line {:?}", line),
        }
        Ok(None)
    }

    fn declare(&mut self, key: &str, attributes: AttributeList) -> Result<(), ErrorKind> {
        match key {
            "INFO" => {
                let info = HeaderInfo::try_from(attributes)?;
                self.info.insert(info.id().clone(), info);
            }
            "FILTER" => {
                let filter = HeaderFilter::try_from(attributes)?;
                self.filter.insert(filter.id().clone(), filter);
            }
            "FORMAT" => {
                let format = HeaderFormat::try_from(attributes)?;
                self.format.insert(format.id().clone(), format);
            }
            _ => {
                // entries without an ID end up under the empty key
                let id = attributes
                    .get("ID")
                    .map(ToString::to_string)
                    .unwrap_or_default();
                self.extra
                    .structured
                    .entry(key.to_owned())
                    .or_default()
                    .insert(id, attributes);
            }
        }
        Ok(())
    }

    fn finish(&mut self, samples: Vec<Sample>) -> Header {
        Header {
            info: mem::take(&mut self.info),
            filter: mem::take(&mut self.filter),
            format: mem::take(&mut self.format),
            samples,
            extra: mem::take(&mut self.extra),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{FieldNumber, FieldType, Value};

    fn build(lines: &[&str]) -> Result<Option<Header>, ErrorKind> {
        let mut builder = HeaderBuilder::default();
        for line in lines {
            if let Some(header) = builder.consume(line)? {
                return Ok(Some(header));
            }
        }
        Ok(None)
    }

    #[test]
    fn test_declarations() {
        let header = build(&[
            "##fileformat=VCFv4.2",
            r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Total Depth">"#,
            r#"##FILTER=<ID=q10,Description="Quality below 10">"#,
            r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
            "##contig=<ID=chr1,length=248956422>",
            "##contig=<ID=2,length=242193529>",
            "##source=tool-a",
            "##source=tool-b",
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA1",
        ])
        .unwrap()
        .unwrap();

        assert_eq!(*header.info()["DP"].number(), FieldNumber::Count(1));
        assert_eq!(header.filter()["q10"].description(), "Quality below 10");
        assert_eq!(*header.format()["GT"].kind(), FieldType::String);
        assert_eq!(header.samples(), &["NA1"]);
        assert_eq!(
            header
                .extra()
                .structured_entry("contig", "chr1")
                .and_then(|c| c.get("length")),
            Some(&Value::Number(248956422.0))
        );
        assert!(header.extra().structured_entry("contig", "2").is_some());
        assert_eq!(header.extra().unstructured_values("source"), ["tool-a", "tool-b"]);
        assert_eq!(header.extra().unstructured_values("fileformat"), ["VCFv4.2"]);
        assert!(header.extra().unstructured_values("reference").is_empty());
    }

    #[test]
    fn test_incomplete_header() {
        assert!(build(&["##fileformat=VCFv4.2"]).unwrap().is_none());
    }

    #[test]
    fn test_invalid_declaration() {
        let err = build(&[r#"##INFO=<ID=DP,Number=1,Description="Total Depth">"#]).unwrap_err();
        assert!(matches!(err, ErrorKind::MissingRequiredKey { key: "Type" }));
    }

    #[test]
    fn test_data_before_header() {
        let err = build(&["##fileformat=VCFv4.2", "chr1\t1\t.\tA\tG\t.\t.\t."]).unwrap_err();
        assert!(matches!(err, ErrorKind::UnexpectedMetadataEnd));
    }
}
