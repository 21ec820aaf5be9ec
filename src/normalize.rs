//! Record normalizer: raw roster rows to validated [`RosterRecord`]s.
//!
//! Fields are looked up by header name, never by position, so reordered or
//! ragged sources still yield the right values. Missing columns and short
//! rows produce empty strings rather than errors.

use crate::domain::{Column, RosterRecord};
use crate::error::SkipReason;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Header name to cell position, built once per table.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Index a header row. When a name repeats, its first occurrence wins.
    pub fn new(header: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            positions.entry(name.clone()).or_insert(idx);
        }
        Self { positions }
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        column.headers().iter().find_map(|h| self.positions.get(*h).copied())
    }

    /// Cell value for `column`, or `""` when the column is absent or the row is too short.
    pub fn get<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.position(column)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Logical columns that no header matched; useful for a one-time warning per table.
    pub fn missing_columns(&self) -> Vec<Column> {
        Column::ALL.iter().copied().filter(|c| self.position(*c).is_none()).collect()
    }
}

/// Turn one raw row into a record.
///
/// `Ok(None)` marks a non-data row (empty first cell) that is skipped silently.
/// Rows without identity or a usable base date are `Err` and never reach the ledger.
pub fn normalize(
    row: &[String],
    index: &HeaderIndex,
    date_format: &str,
) -> Result<Option<RosterRecord>, SkipReason> {
    match row.first() {
        Some(first) if !first.trim().is_empty() => {}
        _ => return Ok(None),
    }

    let fields: BTreeMap<String, String> = Column::ALL
        .iter()
        .map(|c| (c.key().to_string(), index.get(row, *c).to_string()))
        .collect();

    let nip = index.get(row, Column::Nip).trim();
    if nip.is_empty() {
        return Err(SkipReason::MissingIdentity {
            no: index.get(row, Column::No).to_string(),
        });
    }

    let raw_date = index.get(row, Column::TmtLama).trim();
    if raw_date.is_empty() {
        return Err(SkipReason::MissingBaseDate { nip: nip.to_string() });
    }
    let base_date = NaiveDate::parse_from_str(raw_date, date_format).map_err(|source| {
        SkipReason::InvalidBaseDate {
            nip: nip.to_string(),
            value: raw_date.to_string(),
            source,
        }
    })?;

    Ok(Some(RosterRecord {
        nip: nip.to_string(),
        name: index.get(row, Column::Nama).trim().to_string(),
        base_date,
        fields,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ROSTER_DATE_FORMAT;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn header() -> Vec<String> {
        strings(&["NO", "NAMA", "NIP", "PANGKAT", "TMT KGB LAMA/PANGKAT", "GAJI POKOK BARU"])
    }

    #[test]
    fn test_normalize_full_row() {
        let index = HeaderIndex::new(&header());
        let row = strings(&[
            "1",
            "Siti Aminah",
            "198703152010012001",
            "Penata",
            "15-03-2023",
            "3.500.000",
        ]);

        let record = normalize(&row, &index, ROSTER_DATE_FORMAT).unwrap().unwrap();
        assert_eq!(record.nip, "198703152010012001");
        assert_eq!(record.name, "Siti Aminah");
        assert_eq!(record.base_date, NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
        assert_eq!(record.field(Column::Pangkat), "Penata");
        assert_eq!(record.field(Column::GajiPokokBaru), "3.500.000");
        assert_eq!(record.no(), "1");
    }

    #[test]
    fn test_empty_first_cell_is_not_a_data_row() {
        let index = HeaderIndex::new(&header());
        let row = strings(&["", "Subtotal", "", "", "", ""]);
        assert!(normalize(&row, &index, ROSTER_DATE_FORMAT).unwrap().is_none());
        assert!(normalize(&[], &index, ROSTER_DATE_FORMAT).unwrap().is_none());
    }

    #[test]
    fn test_ragged_row_yields_empty_trailing_fields() {
        let index = HeaderIndex::new(&header());
        let row = strings(&["2", "Budi", "1990", "Penata Muda", "01-07-2023"]);

        let record = normalize(&row, &index, ROSTER_DATE_FORMAT).unwrap().unwrap();
        assert_eq!(record.field(Column::GajiPokokBaru), "");
        // Absent from the header entirely.
        assert_eq!(record.field(Column::Satker), "");
    }

    #[test]
    fn test_missing_base_date_is_skipped() {
        let index = HeaderIndex::new(&header());
        let row = strings(&["3", "Citra", "1991", "Penata", ""]);
        assert!(matches!(
            normalize(&row, &index, ROSTER_DATE_FORMAT),
            Err(SkipReason::MissingBaseDate { nip }) if nip == "1991"
        ));
    }

    #[test]
    fn test_unparsable_base_date_is_skipped() {
        let index = HeaderIndex::new(&header());
        let row = strings(&["4", "Dedi", "1992", "Penata", "2023/03/15"]);
        match normalize(&row, &index, ROSTER_DATE_FORMAT) {
            Err(SkipReason::InvalidBaseDate { nip, value, .. }) => {
                assert_eq!(nip, "1992");
                assert_eq!(value, "2023/03/15");
            }
            other => panic!("expected InvalidBaseDate, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_identity_is_skipped() {
        let index = HeaderIndex::new(&header());
        let row = strings(&["5", "Eka", "  ", "Penata", "15-03-2023"]);
        assert!(matches!(
            normalize(&row, &index, ROSTER_DATE_FORMAT),
            Err(SkipReason::MissingIdentity { no }) if no == "5"
        ));
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let header = strings(&["NIP", "TMT KGB LAMA/PANGKAT", "NO", "NAMA"]);
        let index = HeaderIndex::new(&header);
        let row = strings(&["1993", "01-01-2024", "6", "Fajar"]);

        let record = normalize(&row, &index, ROSTER_DATE_FORMAT).unwrap().unwrap();
        assert_eq!(record.nip, "1993");
        assert_eq!(record.name, "Fajar");
        assert_eq!(record.no(), "6");
    }

    #[test]
    fn test_spreadsheet_header_with_line_break_is_accepted() {
        let header = strings(&["NO", "NIP", "TMT KGB LAMA/\nPANGKAT"]);
        let index = HeaderIndex::new(&header);
        let row = strings(&["7", "1994", "28-02-2024"]);

        let record = normalize(&row, &index, ROSTER_DATE_FORMAT).unwrap().unwrap();
        assert_eq!(record.base_date, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
    }

    #[test]
    fn test_header_names_must_match_exactly() {
        let header = strings(&["NO", "nip ", "TMT KGB LAMA/PANGKAT"]);
        let index = HeaderIndex::new(&header);
        assert!(index.position(Column::Nip).is_none());
        assert!(index.missing_columns().contains(&Column::Nip));
    }

    #[test]
    fn test_duplicate_header_keeps_first_position() {
        let header = strings(&["NO", "NIP", "NIP"]);
        let index = HeaderIndex::new(&header);
        assert_eq!(index.position(Column::Nip), Some(1));
    }
}
