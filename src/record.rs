use getset::Getters;
use indexmap::IndexMap;

use crate::types::AttributeList;

/// FORMAT key to raw value for one sample; `None` where the sample column ran out of values.
pub type Genotype = IndexMap<String, Option<String>>;

/// One decoded data line.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Record {
    pub(crate) chrom: String,
    #[getset(skip)]
    pub(crate) pos: u64,
    pub(crate) id: String,
    pub(crate) reference: String,
    /// Raw ALT column, see [`Record::alternate_alleles`].
    pub(crate) alternate: String,
    pub(crate) quality: String,
    pub(crate) filter: String,
    pub(crate) info: AttributeList,
    pub(crate) format: Option<String>,
    /// Present iff the header declares samples, keyed by sample ID in header order.
    pub(crate) genotypes: Option<IndexMap<String, Genotype>>,
}

impl Record {
    /// Returns the position of this record, i.e. POS, 1-based.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Returns the alternative alleles of this record. A missing ALT (`.`) yields no alleles.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf::VcfRecords;
    ///
    /// let lines = vec![
    ///     "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO",
    ///     "chr1\t100\t.\tA\tG,T\t.\tPASS\t.",
    /// ];
    /// let mut records = VcfRecords::new("example", lines.into_iter());
    /// let record = records.read_record().unwrap().unwrap();
    /// assert_eq!(record.alternate_alleles(), ["G", "T"]);
    /// ```
    pub fn alternate_alleles(&self) -> Vec<&str> {
        split_unless_missing(&self.alternate, ',')
    }

    /// Returns the list of filters for this record, empty if FILTER is `.`.
    pub fn filters(&self) -> Vec<&str> {
        split_unless_missing(&self.filter, ';')
    }

    /// Returns the quality value of this record, i.e. QUAL.
    /// If not set (`.`) or not a number, return `None`.
    pub fn quality_value(&self) -> Option<f64> {
        self.quality.parse().ok()
    }

    pub fn genotype(&self, sample: &str) -> Option<&Genotype> {
        self.genotypes.as_ref().and_then(|g| g.get(sample))
    }
}

fn split_unless_missing(column: &str, separator: char) -> Vec<&str> {
    if column == "." {
        vec![]
    } else {
        column.split(separator).collect()
    }
}
