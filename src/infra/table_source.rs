use crate::app::ports::{HttpClientPort, TableSourcePort};
use crate::domain::Table;
use crate::error::SourceError;
use crate::infra::quote_sanitizer::sanitize_quotes;
use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Parse CSV bytes into a table, tolerating stray quotes and ragged rows.
pub fn table_from_csv(bytes: &[u8]) -> Result<Table, SourceError> {
    let cleaned = sanitize_quotes(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(cleaned.as_slice());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Table::from_rows(rows)
}

/// Published CSV export fetched over HTTP on every scan.
pub struct CsvExportSource {
    url: String,
    http: Arc<dyn HttpClientPort>,
}

impl CsvExportSource {
    pub fn new(url: impl Into<String>, http: Arc<dyn HttpClientPort>) -> Self {
        Self { url: url.into(), http }
    }
}

#[async_trait]
impl TableSourcePort for CsvExportSource {
    async fn fetch_table(&self) -> Result<Table, SourceError> {
        info!(source = %self.url, "Downloading roster CSV export");
        let resp = self.http.get(&self.url).await?;
        if !(200..=299).contains(&resp.status) {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status: resp.status,
            });
        }
        debug!(bytes = resp.bytes.len(), content_type = %resp.content_type, "Roster downloaded");
        let table = table_from_csv(&resp.bytes)?;
        info!(rows = table.rows.len(), "Roster CSV parsed");
        Ok(table)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Local roster file: CSV, or a workbook sheet (xlsx, xlsm, xls, ods).
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
    sheet: String,
    date_format: String,
}

impl LocalFileSource {
    pub fn new(
        path: impl Into<PathBuf>,
        sheet: impl Into<String>,
        date_format: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
            date_format: date_format.into(),
        }
    }

    fn is_csv(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
    }

    fn read_workbook(&self) -> Result<Table, SourceError> {
        let mut workbook = open_workbook_auto(&self.path)?;
        if !workbook.sheet_names().iter().any(|name| name == &self.sheet) {
            return Err(SourceError::MissingSheet {
                path: self.path.display().to_string(),
                sheet: self.sheet.clone(),
            });
        }
        let range = workbook.worksheet_range(&self.sheet)?;
        let rows = range
            .rows()
            .map(|row| {
                let mut cells: Vec<String> =
                    row.iter().map(|c| cell_text(c, &self.date_format)).collect();
                // Match CSV exports, which do not pad rows with trailing empty cells.
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();
        Table::from_rows(rows)
    }
}

/// Render a workbook cell as the text a CSV export would contain.
fn cell_text(cell: &Data, date_format: &str) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format(date_format).to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

#[async_trait]
impl TableSourcePort for LocalFileSource {
    async fn fetch_table(&self) -> Result<Table, SourceError> {
        info!(source = %self.path.display(), sheet = %self.sheet, "Loading roster file");
        let table = if self.is_csv() {
            let bytes = tokio::fs::read(&self.path).await?;
            table_from_csv(&bytes)?
        } else {
            // calamine reads synchronously
            let source = self.clone();
            tokio::task::spawn_blocking(move || source.read_workbook()).await??
        };
        info!(rows = table.rows.len(), "Roster file parsed");
        Ok(table)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pick the source kind from the stored setting: http(s) URLs are CSV exports,
/// anything else is a local path.
pub fn source_for(
    setting: &str,
    sheet: &str,
    date_format: &str,
    http: Arc<dyn HttpClientPort>,
) -> Arc<dyn TableSourcePort> {
    let setting = setting.trim();
    let lower = setting.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Arc::new(CsvExportSource::new(setting, http))
    } else {
        Arc::new(LocalFileSource::new(Path::new(setting), sheet, date_format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use std::io::Write;

    struct StaticHttp {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpClientPort for StaticHttp {
        async fn get(&self, _url: &str) -> Result<HttpGetResult, SourceError> {
            Ok(HttpGetResult {
                status: self.status,
                bytes: self.body.as_bytes().to_vec(),
                content_type: "text/csv".to_string(),
            })
        }
    }

    #[test]
    fn test_table_from_csv_keeps_ragged_rows() {
        let table = table_from_csv(b"NO,NAMA,NIP\n1,Aminah\n2,Budi,1990,extra\n").unwrap();
        assert_eq!(table.header, vec!["NO", "NAMA", "NIP"]);
        assert_eq!(table.rows[0], vec!["1", "Aminah"]);
        assert_eq!(table.rows[1].len(), 4);
    }

    #[test]
    fn test_empty_csv_is_an_error() {
        assert!(matches!(table_from_csv(b""), Err(SourceError::EmptyTable)));
    }

    #[tokio::test]
    async fn test_csv_export_source_parses_body() {
        let http = Arc::new(StaticHttp { status: 200, body: "NO,NIP\n1,1990\n" });
        let source = CsvExportSource::new("https://example.com/export?format=csv", http);
        let table = source.fetch_table().await.unwrap();
        assert_eq!(table.rows, vec![vec!["1".to_string(), "1990".to_string()]]);
    }

    #[tokio::test]
    async fn test_csv_export_source_rejects_error_status() {
        let http = Arc::new(StaticHttp { status: 404, body: "not found" });
        let source = CsvExportSource::new("https://example.com/missing", http);
        assert!(matches!(
            source.fetch_table().await,
            Err(SourceError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_local_csv_file_source() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "NO,NIP,TMT KGB LAMA/PANGKAT").unwrap();
        writeln!(file, "1,1990,15-03-2023").unwrap();

        let source = LocalFileSource::new(file.path(), "KGB", "%d-%m-%Y");
        let table = source.fetch_table().await.unwrap();
        assert_eq!(table.rows[0][2], "15-03-2023");
    }

    #[tokio::test]
    async fn test_missing_local_file_is_a_source_error() {
        let source = LocalFileSource::new("/nonexistent/roster.xlsx", "KGB", "%d-%m-%Y");
        assert!(source.fetch_table().await.is_err());
    }

    fn roster_workbook() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/roster.xlsx")
    }

    #[tokio::test]
    async fn test_workbook_sheet_renders_dates_in_roster_format() {
        let source = LocalFileSource::new(roster_workbook(), "KGB", "%d-%m-%Y");
        let table = source.fetch_table().await.unwrap();

        assert_eq!(table.header[3], "TMT KGB LAMA/\nPANGKAT");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            vec!["1", "Siti Aminah", "198703152010012001", "15-03-2023", "Kanwil"]
        );
        // Trailing empty Satker cell is dropped like in a CSV export.
        assert_eq!(table.rows[1], vec!["2", "Budi Santoso", "198801012011011002", "01-06-2023"]);
    }

    #[tokio::test]
    async fn test_workbook_rows_normalize() {
        use crate::normalize::{normalize, HeaderIndex};

        let source = LocalFileSource::new(roster_workbook(), "KGB", "%d-%m-%Y");
        let table = source.fetch_table().await.unwrap();
        let index = HeaderIndex::new(&table.header);
        let record = normalize(&table.rows[0], &index, "%d-%m-%Y").unwrap().unwrap();
        assert_eq!(record.base_date, chrono::NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
        assert_eq!(record.name, "Siti Aminah");
    }

    #[tokio::test]
    async fn test_workbook_date_cells_follow_configured_format() {
        let source = LocalFileSource::new(roster_workbook(), "KGB", "%Y/%m/%d");
        let table = source.fetch_table().await.unwrap();
        assert_eq!(table.rows[0][3], "2023/03/15");
    }

    #[tokio::test]
    async fn test_workbook_without_roster_sheet() {
        let source = LocalFileSource::new(roster_workbook(), "Pegawai", "%d-%m-%Y");
        match source.fetch_table().await {
            Err(SourceError::MissingSheet { sheet, .. }) => assert_eq!(sheet, "Pegawai"),
            other => panic!("expected MissingSheet, got {other:?}"),
        }
    }

    #[test]
    fn test_source_for_picks_kind_by_scheme() {
        let http: Arc<dyn HttpClientPort> = Arc::new(StaticHttp { status: 200, body: "" });
        let remote = source_for("https://docs.example.com/x.csv", "KGB", "%d-%m-%Y", http.clone());
        assert_eq!(remote.describe(), "https://docs.example.com/x.csv");
        let local = source_for(" data.xlsx ", "KGB", "%d-%m-%Y", http);
        assert_eq!(local.describe(), "data.xlsx");
    }

    #[test]
    fn test_cell_text_renders_plain_values() {
        assert_eq!(cell_text(&Data::Empty, "%d-%m-%Y"), "");
        assert_eq!(cell_text(&Data::String("Penata".into()), "%d-%m-%Y"), "Penata");
        assert_eq!(cell_text(&Data::Int(42), "%d-%m-%Y"), "42");
    }
}
