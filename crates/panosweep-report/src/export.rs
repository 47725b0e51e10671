//! Flat TSV export of the panorama table.

use chrono::NaiveDate;
use panosweep_core::config::LayeredConfig;
use panosweep_core::error::Result;
use panosweep_core::models::PanoramaRecord;
use panosweep_store::PanoramaStore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Rendered in place of a missing value
pub const NULL_SENTINEL: &str = "NULL";

pub const HEADER: [&str; 8] =
    ["pano_id", "lat", "lon", "date", "copyright", "heading", "pitch", "roll"];

const DELIMITER: char = '\t';

/// Expand a month-granularity date ("YYYY-MM") to the first of the month.
///
/// Anything after the seventh character is dropped. A value that does not
/// start with a valid year-month is returned unchanged.
pub fn normalize_date(date: &str) -> String {
    let Some(month) = date.get(..7) else {
        return date.to_string();
    };
    let day = format!("{}-01", month);
    match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
        Ok(_) => day,
        Err(_) => date.to_string(),
    }
}

/// One exported line, in field order
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub pano_id: String,
    pub lat: f64,
    pub lon: f64,
    pub date: Option<String>,
    pub copyright: Option<String>,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl ExportRow {
    pub fn from_record(record: &PanoramaRecord) -> Self {
        let record = record.clone().normalized();
        Self {
            date: record.date.as_deref().map(normalize_date),
            pano_id: record.pano_id,
            lat: record.lat,
            lon: record.lon,
            copyright: record.copyright,
            heading: record.heading,
            pitch: record.pitch,
            roll: record.roll,
        }
    }

    /// Field values as written, nulls replaced by the sentinel
    pub fn fields(&self) -> [String; 8] {
        let text = |value: &Option<String>| {
            value.clone().unwrap_or_else(|| NULL_SENTINEL.to_string())
        };
        [
            self.pano_id.clone(),
            format_float(self.lat),
            format_float(self.lon),
            text(&self.date),
            text(&self.copyright),
            format_float(self.heading),
            format_float(self.pitch),
            format_float(self.roll),
        ]
    }
}

/// Shortest round-trip representation, always with a decimal point
fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

fn quote(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_line<W: Write>(writer: &mut W, fields: &[String]) -> std::io::Result<()> {
    let line = fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join("\t");
    writeln!(writer, "{}", line)
}

/// Every stored panorama as an export row, ordered by identifier
pub async fn export_rows<S>(store: &S) -> Result<Vec<ExportRow>>
where
    S: PanoramaStore + ?Sized,
{
    Ok(store.list_panoramas().await?.iter().map(ExportRow::from_record).collect())
}

/// Write the header and one line per row; returns the number of rows
pub fn write_tsv<W: Write>(mut writer: W, rows: &[ExportRow]) -> Result<usize> {
    let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
    write_line(&mut writer, &header)?;
    for row in rows {
        write_line(&mut writer, &row.fields())?;
    }
    writer.flush()?;
    Ok(rows.len())
}

/// Export the panorama table to a TSV file at `path`, replacing it
pub async fn export_to_path<S>(store: &S, path: impl AsRef<Path>) -> Result<usize>
where
    S: PanoramaStore + ?Sized,
{
    let path = path.as_ref();
    let rows = export_rows(store).await?;
    let file = File::create(path)?;
    let written = write_tsv(BufWriter::new(file), &rows)?;

    tracing::info!(path = %path.display(), rows = written, "Exported panoramas");
    Ok(written)
}

/// Export to the configured `export_path`
pub async fn export_configured<S>(store: &S, config: &LayeredConfig) -> Result<usize>
where
    S: PanoramaStore + ?Sized,
{
    export_to_path(store, &config.export_path.value).await
}
