use crate::error::SourceError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// A header row plus data rows, exactly as delivered by a table source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Split raw rows into header and data. A table without even a header row is an error.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Result<Self, SourceError> {
        if rows.is_empty() {
            return Err(SourceError::EmptyTable);
        }
        let header = rows.remove(0);
        Ok(Self { header, rows })
    }
}

/// Logical roster columns and the exact header texts they are found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    No,
    Nama,
    Nip,
    Pangkat,
    Gol,
    TempatLahir,
    TanggalLahir,
    TmtLama,
    GajiPokokLama,
    MasaKerjaLama,
    TmtBaru,
    GajiPokokBaru,
    MasaKerjaBaru,
    KgbBerikutnya,
    OlehPejabat,
    NomorSurat,
    TanggalSurat,
    Tembusan,
    Tembusan1,
    Satker,
    Di,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Column::No,
        Column::Nama,
        Column::Nip,
        Column::Pangkat,
        Column::Gol,
        Column::TempatLahir,
        Column::TanggalLahir,
        Column::TmtLama,
        Column::GajiPokokLama,
        Column::MasaKerjaLama,
        Column::TmtBaru,
        Column::GajiPokokBaru,
        Column::MasaKerjaBaru,
        Column::KgbBerikutnya,
        Column::OlehPejabat,
        Column::NomorSurat,
        Column::TanggalSurat,
        Column::Tembusan,
        Column::Tembusan1,
        Column::Satker,
        Column::Di,
    ];

    /// Key under which the value is exposed to message templates.
    pub fn key(self) -> &'static str {
        match self {
            Column::No => "no",
            Column::Nama => "nama",
            Column::Nip => "nip",
            Column::Pangkat => "pangkat",
            Column::Gol => "gol",
            Column::TempatLahir => "tempat_lahir",
            Column::TanggalLahir => "tanggal_lahir",
            Column::TmtLama => "tmt_lama",
            Column::GajiPokokLama => "gaji_pokok_lama",
            Column::MasaKerjaLama => "masa_kerja_lama",
            Column::TmtBaru => "tmt_baru",
            Column::GajiPokokBaru => "gaji_pokok_baru",
            Column::MasaKerjaBaru => "masa_kerja_baru",
            Column::KgbBerikutnya => "kgb_berikutnya",
            Column::OlehPejabat => "oleh_pejabat",
            Column::NomorSurat => "nomor_srt",
            Column::TanggalSurat => "tanggal_srt",
            Column::Tembusan => "tembusan",
            Column::Tembusan1 => "tembusan_1",
            Column::Satker => "satker",
            Column::Di => "di",
        }
    }

    /// Header texts, in order of preference. Matching is exact.
    ///
    /// The base-date column carries a line break in the spreadsheet file but
    /// not in the published CSV export, so both spellings are accepted.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Column::No => &["NO"],
            Column::Nama => &["NAMA"],
            Column::Nip => &["NIP"],
            Column::Pangkat => &["PANGKAT"],
            Column::Gol => &["GOL"],
            Column::TempatLahir => &["TMP LAHIR"],
            Column::TanggalLahir => &["TGL LAHIR"],
            Column::TmtLama => &["TMT KGB LAMA/PANGKAT", "TMT KGB LAMA/\nPANGKAT"],
            Column::GajiPokokLama => &["GAJI POKOK LAMA"],
            Column::MasaKerjaLama => &["MASA KERJA LAMA"],
            Column::TmtBaru => &["TMT KGB  BARU"],
            Column::GajiPokokBaru => &["GAJI POKOK BARU"],
            Column::MasaKerjaBaru => &["MASA KERJA BARU"],
            Column::KgbBerikutnya => &["KGB BERIKUTNYA"],
            Column::OlehPejabat => &["OLEH PEJABAT"],
            Column::NomorSurat => &["NOMOR_SRT"],
            Column::TanggalSurat => &["TGL"],
            Column::Tembusan => &["TEMBUSAN"],
            Column::Tembusan1 => &["TEMBUSAN_1"],
            Column::Satker => &["Satker"],
            Column::Di => &["di"],
        }
    }
}

/// One employee's KGB snapshot for the current scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRecord {
    /// Stable personnel identifier (NIP), never empty.
    pub nip: String,
    pub name: String,
    /// Old effective date (TMT KGB lama).
    pub base_date: NaiveDate,
    /// Every roster column by template key, carried through untouched.
    pub fields: BTreeMap<String, String>,
}

impl RosterRecord {
    pub fn field(&self, column: Column) -> &str {
        self.fields.get(column.key()).map(String::as_str).unwrap_or("")
    }

    /// Row number as written in the roster, for log lines.
    pub fn no(&self) -> &str {
        self.field(Column::No)
    }
}
