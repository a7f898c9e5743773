//! Styled spreadsheet export of a finished batch.

use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, FormatAlign, Workbook, XlsxError};

use crate::classify::NOT_APPLICABLE;
use crate::record::{Flag, FileRecord};

/// Column order of the report sheet. Flag columns sit directly after
/// the value they judge.
pub const REPORT_COLUMNS: [&str; 7] = [
    "File Name",
    "Video Format",
    "Video Format Flag",
    "Video Codecs",
    "Video Codecs Flag",
    "File Size",
    "File Size Flag",
];

const COLUMN_WIDTHS: [f64; 7] = [50.0, 15.0, 18.0, 35.0, 18.0, 15.0, 15.0];

const HEADER_FILL: u32 = 0x4472C4;
const PASS_FILL: u32 = 0xC6EFCE;
const PASS_TEXT: u32 = 0x006100;
const FAIL_FILL: u32 = 0xFFC7CE;
const FAIL_TEXT: u32 = 0x9C0006;

/// One rendered data row, flags still structured so the writer can
/// pick cell styles.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub name: String,
    pub format: String,
    pub format_flag: Flag,
    pub codecs: String,
    pub codec_flag: Flag,
    pub size_mb: String,
    pub size_flag: Flag,
}

/// Render records into sheet rows, in batch order.
pub fn build_rows(records: &[FileRecord]) -> Vec<ReportRow> {
    records
        .iter()
        .map(|r| ReportRow {
            name: r.name.clone(),
            format: r.format.clone(),
            format_flag: r.format_flag,
            codecs: if r.video_codec == NOT_APPLICABLE && r.audio_codec == NOT_APPLICABLE {
                NOT_APPLICABLE.to_string()
            } else {
                r.codecs_summary()
            },
            codec_flag: r.codec_flag,
            size_mb: format!("{:.2} MB", r.size_mib()),
            size_flag: r.size_flag,
        })
        .collect()
}

/// Write the styled report to `path`. Workbook metadata is pinned so
/// the same batch always produces identical bytes.
pub fn write_xlsx(path: &Path, records: &[FileRecord]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let properties =
        DocProperties::new().set_creation_datetime(&ExcelDateTime::from_ymd(2024, 1, 1)?);
    workbook.set_properties(&properties);

    let header_format = Format::new()
        .set_bold()
        .set_font_color(0xFFFFFF)
        .set_background_color(HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let pass_format = Format::new()
        .set_bold()
        .set_font_color(PASS_TEXT)
        .set_background_color(PASS_FILL);
    let fail_format = Format::new()
        .set_bold()
        .set_font_color(FAIL_TEXT)
        .set_background_color(FAIL_FILL);

    let sheet = workbook.add_worksheet();
    sheet.set_name("Video Metadata")?;

    for (col, title) in REPORT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    for (i, row) in build_rows(records).iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.name)?;
        sheet.write_string(r, 1, &row.format)?;
        sheet.write_string(r, 3, &row.codecs)?;
        sheet.write_string(r, 5, &row.size_mb)?;
        for (col, flag) in [(2, row.format_flag), (4, row.codec_flag), (6, row.size_flag)] {
            let format = if flag.is_pass() { &pass_format } else { &fail_format };
            sheet.write_string_with_format(r, col, flag.label(), format)?;
        }
    }

    sheet.autofilter(0, 0, records.len() as u32, (REPORT_COLUMNS.len() - 1) as u16)?;
    sheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Timestamped default filename for a report.
pub fn suggested_filename() -> String {
    format!("video_metadata_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"))
}
