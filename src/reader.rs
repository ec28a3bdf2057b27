use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use log::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::header::HeaderBuilder;
use crate::parser;
use crate::record::Record;
use crate::types::HeaderRef;

/// Anything a line source may yield: plain text, or a line read from an I/O source.
pub trait IntoLine {
    fn into_line(self) -> io::Result<String>;
}

impl IntoLine for String {
    fn into_line(self) -> io::Result<String> {
        Ok(self)
    }
}

impl IntoLine for &str {
    fn into_line(self) -> io::Result<String> {
        Ok(self.to_owned())
    }
}

impl IntoLine for &String {
    fn into_line(self) -> io::Result<String> {
        Ok(self.clone())
    }
}

impl IntoLine for io::Result<String> {
    fn into_line(self) -> io::Result<String> {
        self
    }
}

#[derive(Debug)]
enum State {
    Header(HeaderBuilder),
    Records(HeaderRef),
}

/// Parsing state shared by [`VcfRecords`] and [`crate::AsyncVcfRecords`].
///
/// The readers only differ in how they pull the next line; every pulled line goes through here.
#[derive(Debug)]
pub(crate) struct LineParser {
    source_name: String,
    line_number: usize,
    state: State,
}

impl LineParser {
    pub(crate) fn new(source_name: String) -> Self {
        Self {
            source_name,
            line_number: 0,
            state: State::Header(HeaderBuilder::default()),
        }
    }

    pub(crate) fn header(&self) -> Option<&HeaderRef> {
        match &self.state {
            State::Records(header) => Some(header),
            State::Header(_) => None,
        }
    }

    pub(crate) fn source_name(&self) -> &str {
        &self.source_name
    }

    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    fn error(&self, kind: ErrorKind) -> Error {
        Error::located(kind, &self.source_name, self.line_number)
    }

    fn pull(&mut self, line: impl IntoLine) -> Result<String> {
        self.line_number += 1;
        line.into_line().map_err(|e| self.error(e.into()))
    }

    /// Feeds the next header line, `None` meaning the source is exhausted.
    /// Returns the header once the `#CHROM` line has been seen.
    pub(crate) fn push_header_line(
        &mut self,
        line: Option<impl IntoLine>,
    ) -> Result<Option<HeaderRef>> {
        if let Some(header) = self.header() {
            return Ok(Some(header.clone()));
        }
        let line = match line {
            Some(line) => self.pull(line)?,
            None => return Err(self.error(ErrorKind::UnexpectedEndOfInput)),
        };
        let builder = match &mut self.state {
            State::Header(builder) => builder,
            State::Records(header) => return Ok(Some(header.clone())),
        };
        match builder.consume(&line) {
            Ok(Some(header)) => {
                debug!(
                    "{}: parsed header with {} INFO, {} FILTER, {} FORMAT declarations and {} samples",
                    self.source_name,
                    header.info().len(),
                    header.filter().len(),
                    header.format().len(),
                    header.sample_count()
                );
                let header = HeaderRef::new(header);
                self.state = State::Records(header.clone());
                Ok(Some(header))
            }
            Ok(None) => Ok(None),
            Err(kind) => Err(self.error(kind)),
        }
    }

    /// Decodes the next data line, `None` meaning the source is exhausted.
    pub(crate) fn push_record_line(
        &mut self,
        header: &HeaderRef,
        line: Option<impl IntoLine>,
    ) -> Result<Option<Record>> {
        let line = match line {
            Some(line) => self.pull(line)?,
            None => return Ok(None),
        };
        parser::record(&line, header)
            .map(Some)
            .map_err(|kind| self.error(kind))
    }
}

/// Reads a VCF from a synchronous line source.
///
/// The header is parsed on the first call to [`VcfRecords::meta`] or [`VcfRecords::read_record`].
///
/// # Examples
///
/// ```
/// use rust_vcf::{Value, VcfRecords};
///
/// let lines = vec![
///     r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Depth">"#,
///     "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
///     "chr1\t100\t.\tA\tG\t30\tPASS\tDP=10",
/// ];
/// let mut records = VcfRecords::new("example", lines.into_iter());
/// assert!(records.meta().unwrap().info().contains_key("DP"));
/// let record = records.read_record().unwrap().unwrap();
/// assert_eq!(record.info()["DP"], Value::Number(10.0));
/// assert!(records.read_record().unwrap().is_none());
/// ```
pub struct VcfRecords<I> {
    parser: LineParser,
    lines: I,
    done: bool,
}

impl<I> VcfRecords<I>
where
    I: Iterator,
    I::Item: IntoLine,
{
    pub fn new(source_name: impl Into<String>, lines: I) -> Self {
        Self {
            parser: LineParser::new(source_name.into()),
            lines,
            done: false,
        }
    }

    /// Returns the header, reading it from the source on the first call only.
    pub fn meta(&mut self) -> Result<HeaderRef> {
        if let Some(header) = self.parser.header() {
            return Ok(header.clone());
        }
        loop {
            let line = self.lines.next();
            if let Some(header) = self.parser.push_header_line(line)? {
                return Ok(header);
            }
        }
    }

    /// Reads the next record, or `None` once the source is exhausted.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let header = self.meta()?;
        let line = self.lines.next();
        self.parser.push_record_line(&header, line)
    }

    pub fn source_name(&self) -> &str {
        self.parser.source_name()
    }

    /// Number of lines pulled from the source so far, header lines included.
    pub fn line_number(&self) -> usize {
        self.parser.line_number()
    }
}

impl<R: BufRead> VcfRecords<io::Lines<R>> {
    pub fn from_reader(source_name: impl Into<String>, reader: R) -> Self {
        Self::new(source_name, reader.lines())
    }
}

impl VcfRecords<io::Lines<BufReader<Box<dyn Read>>>> {
    /// Opens a plain or compressed VCF file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let (reader, _format) = niffler::from_path(path)?;
        Ok(Self::from_reader(
            path.display().to_string(),
            BufReader::new(reader),
        ))
    }
}

impl<I> Iterator for VcfRecords<I>
where
    I: Iterator,
    I::Item: IntoLine,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.read_record().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }
        next
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{FieldNumber, Value};

    const SITES_ONLY: &[&str] = &[
        r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Depth">"#,
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
        "chr1\t100\t.\tA\tG\t30\tPASS\tDP=10",
    ];

    #[test]
    fn test_sites_only() {
        let mut records = VcfRecords::new("sites.vcf", SITES_ONLY.iter().copied());
        let header = records.meta().unwrap();
        assert_eq!(*header.info()["DP"].number(), FieldNumber::Count(1));
        assert!(header.samples().is_empty());

        let record = records.read_record().unwrap().unwrap();
        assert_eq!(record.info()["DP"], Value::Number(10.0));
        assert!(record.genotypes().is_none());
        assert!(records.read_record().unwrap().is_none());
        assert_eq!(records.line_number(), 3);
    }

    #[test]
    fn test_meta_is_cached() {
        let mut records = VcfRecords::new("sites.vcf", SITES_ONLY.iter().copied());
        let first = records.meta().unwrap();
        let consumed = records.line_number();
        let second = records.meta().unwrap();
        assert!(HeaderRef::ptr_eq(&first, &second));
        assert_eq!(records.line_number(), consumed);
    }

    #[test]
    fn test_header_lines_after_header_are_not_consumed() {
        let mut parser = LineParser::new("sites.vcf".to_owned());
        for &line in &SITES_ONLY[..2] {
            parser.push_header_line(Some(line)).unwrap();
        }
        assert_eq!(parser.line_number(), 2);
        let header = parser.push_header_line(Some(SITES_ONLY[2])).unwrap().unwrap();
        assert!(HeaderRef::ptr_eq(&header, parser.header().unwrap()));
        assert_eq!(parser.line_number(), 2);
    }

    #[test]
    fn test_samples() {
        let lines = vec![
            "##fileformat=VCFv4.2".to_owned(),
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tHG001\tHG002".to_owned(),
            "chr1\t100\t.\tA\tG\t30\tPASS\t.\tGT:DP\t0/1:12\t1/1".to_owned(),
        ];
        let records = VcfRecords::new("trio.vcf", lines.into_iter())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        let genotypes = records[0].genotypes().as_ref().unwrap();
        assert_eq!(genotypes["HG001"]["DP"].as_deref(), Some("12"));
        assert_eq!(genotypes["HG002"]["DP"], None);
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let mut records = VcfRecords::new("truncated.vcf", vec!["##fileformat=VCFv4.2"].into_iter());
        let err = records.meta().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnexpectedEndOfInput));
        assert_eq!(err.to_string(), "reading truncated.vcf:1: unexpected end of input");
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let lines = vec![
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
            "chr1\t100\t.\tA\tG\t30\tPASS\tDP=10",
            "chr1\t200\t.\tA\tG\t30\tPASS",
        ];
        let mut records = VcfRecords::new("short.vcf", lines.into_iter());
        assert!(records.next().unwrap().is_ok());
        let err = records.next().unwrap().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::FieldCountMismatch { expected: 8, found: 7 }
        ));
        assert_eq!(err.location().map(|l| l.line), Some(3));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_io_errors_are_surfaced() {
        let lines: Vec<io::Result<String>> = vec![
            Ok("##fileformat=VCFv4.2".into()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad gzip block")),
        ];
        let mut records = VcfRecords::new("broken.vcf.gz", lines.into_iter());
        let err = records.meta().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
        assert_eq!(err.location().map(|l| l.line), Some(2));
    }

    #[test]
    fn test_from_reader() {
        let text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\r\nchr2\t7\t.\tC\tT\t.\t.\tDB\r\n";
        let mut records = VcfRecords::from_reader("inline", text.as_bytes());
        let record = records.read_record().unwrap().unwrap();
        assert_eq!(record.pos(), 7);
        assert_eq!(record.info()["DB"], Value::Absent);
        assert!(records.read_record().unwrap().is_none());
    }
}
