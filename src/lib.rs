pub mod async_reader;
pub mod error;
pub(crate) mod header;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod types;
pub mod vep;

pub use async_reader::AsyncVcfRecords;
pub use error::{Error, ErrorKind, Result};
pub use reader::{IntoLine, VcfRecords};
pub use record::{Genotype, Record};
pub use types::{
    AttributeList, FieldDeclaration, FieldNumber, FieldType, Header, HeaderFilter, HeaderRef,
    Value,
};
pub use vep::{vep_annotation_parser, VepAnnotation, VepParser, DEFAULT_VEP_FIELD};
