//! CSV ingestion of raw filing rows.
//!
//! Headers may use either the row field names (`fiscal_year`,
//! `account_name`, ...) or the regulator API column names (`bsns_year`,
//! `account_nm`, ...). Empty cells are read as missing values.

use csv::ReaderBuilder;
use finmodel::curate::RawFilingRow;
use std::io::Read;

/// Read every row of a CSV document.
pub(crate) fn read_rows<R: Read>(reader: R) -> Result<Vec<RawFilingRow>, csv::Error> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader);
    rdr.deserialize::<RawFilingRow>().collect()
}
