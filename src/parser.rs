use itertools::Itertools;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_till1};
use nom::character::complete::char;
use nom::combinator::{cut, map, opt, rest};
use nom::sequence::{preceded, separated_pair, terminated};
use nom::IResult;

use crate::error::ErrorKind;
use crate::record::{Genotype, Record};
use crate::types::{AttributeList, Header, Sample, Value};

pub(crate) const FIXED_COLUMNS: [&str; 9] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

// Sites-only files (e.g. gnomAD) stop after INFO. A FORMAT column with no samples
// still counts as sites-only, so its data lines must have 8 columns.
const SITES_ONLY_COLUMNS: usize = FIXED_COLUMNS.len() - 1;

fn quoted_value(input: &str) -> IResult<&str, &str> {
    preceded(char('"'), cut(terminated(take_till(|c: char| c == '"'), char('"'))))(input)
}

fn attribute(separator: char) -> impl FnMut(&str) -> IResult<&str, (&str, Value)> {
    move |input: &str| {
        let (input, key) = take_till(|c: char| c == '=' || c == separator)(input)?;
        let (input, value) = match opt(char('='))(input)? {
            (input, None) => (input, Value::Absent),
            (input, Some(_)) => alt((
                map(quoted_value, |v: &str| Value::String(v.to_owned())),
                map(take_till(|c: char| c == separator), Value::coerce),
            ))(input)?,
        };
        let (input, _) = opt(char(separator))(input)?;
        Ok((input, (key, value)))
    }
}

/// Parses `key`, `key=value` and `key="quoted value"` items separated by `separator`.
///
/// Quoted values stay strings, unquoted ones are coerced to numbers where possible.
pub(crate) fn attribute_list(input: &str, separator: char) -> Result<AttributeList, ErrorKind> {
    let mut attributes = AttributeList::default();
    let mut input = input;
    let mut next_attribute = attribute(separator);
    while !input.is_empty() {
        match next_attribute(input) {
            Ok((remaining, (key, value))) => {
                attributes.insert(key.to_owned(), value);
                input = remaining;
            }
            // the only way an item can fail is a missing closing quote
            Err(_) => {
                let key = input
                    .split(|c: char| c == '=' || c == separator)
                    .next()
                    .unwrap_or_default();
                return Err(ErrorKind::UnterminatedQuotedValue {
                    key: key.to_owned(),
                });
            }
        }
    }
    Ok(attributes)
}

fn meta_entry(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        tag("##"),
        separated_pair(take_till1(|c: char| c == '='), char('='), rest),
    )(input)
}

#[derive(Debug, PartialEq)]
pub(crate) enum MetaLine<'a> {
    /// `##KEY=<...>`
    Structured {
        key: &'a str,
        attributes: AttributeList,
    },
    /// `##KEY=value`
    Unstructured { key: &'a str, value: &'a str },
    /// `#CHROM\tPOS...`
    ColumnHeader { samples: Vec<Sample> },
    Comment,
}

pub(crate) fn meta_line(line: &str) -> Result<MetaLine<'_>, ErrorKind> {
    let line = line.trim();
    if !line.starts_with('#') {
        return Err(ErrorKind::UnexpectedMetadataEnd);
    }
    if line.starts_with("##") {
        let (_, (key, value)) =
            meta_entry(line).map_err(|_| ErrorKind::MalformedMetaLine {
                line: line.to_owned(),
            })?;
        return match value.strip_prefix('<') {
            Some(body) => {
                let body = body.strip_suffix('>').unwrap_or(body);
                Ok(MetaLine::Structured {
                    key,
                    attributes: attribute_list(body, ',')?,
                })
            }
            None => Ok(MetaLine::Unstructured {
                key,
                value: value.trim(),
            }),
        };
    }
    if line.starts_with("#CHROM") {
        return column_header(line).map(|samples| MetaLine::ColumnHeader { samples });
    }
    Ok(MetaLine::Comment)
}

fn column_header(line: &str) -> Result<Vec<Sample>, ErrorKind> {
    let columns = line.split('\t').collect_vec();
    let required = if columns.len() == SITES_ONLY_COLUMNS {
        SITES_ONLY_COLUMNS
    } else {
        FIXED_COLUMNS.len()
    };
    for (i, &expected) in FIXED_COLUMNS.iter().enumerate().take(required) {
        if columns.get(i) != Some(&expected) {
            return Err(ErrorKind::MalformedHeader {
                column: i + 1,
                expected,
                found: columns.get(i).map(|&c| c.to_owned()),
            });
        }
    }
    Ok(columns
        .into_iter()
        .skip(FIXED_COLUMNS.len())
        .map(str::to_owned)
        .collect())
}

fn genotype(keys: &[&str], column: &str) -> Genotype {
    let mut values = column.split(':');
    keys.iter()
        .map(|&key| (key.to_owned(), values.next().map(str::to_owned)))
        .collect()
}

/// Decodes one data line against a finished header.
pub(crate) fn record(line: &str, header: &Header) -> Result<Record, ErrorKind> {
    let columns = line.trim().split('\t').collect_vec();
    let samples = header.samples();
    let expected = if samples.is_empty() {
        SITES_ONLY_COLUMNS
    } else {
        FIXED_COLUMNS.len() + samples.len()
    };
    if columns.len() != expected {
        return Err(ErrorKind::FieldCountMismatch {
            expected,
            found: columns.len(),
        });
    }
    let pos = columns[1]
        .parse()
        .map_err(|_| ErrorKind::InvalidPosition {
            value: columns[1].to_owned(),
        })?;
    let info = attribute_list(columns[7], ';')?;

    let (format, genotypes) = if samples.is_empty() {
        (None, None)
    } else {
        let keys = columns[8].split(':').collect_vec();
        let genotypes = samples
            .iter()
            .zip(&columns[FIXED_COLUMNS.len()..])
            .map(|(sample, column)| (sample.clone(), genotype(&keys, column)))
            .collect();
        (Some(columns[8].to_owned()), Some(genotypes))
    };

    Ok(Record {
        chrom: columns[0].to_owned(),
        pos,
        id: columns[2].to_owned(),
        reference: columns[3].to_owned(),
        alternate: columns[4].to_owned(),
        quality: columns[5].to_owned(),
        filter: columns[6].to_owned(),
        info,
        format,
        genotypes,
    })
}
