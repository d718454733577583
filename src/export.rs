//! Spreadsheet download of the post table.

use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use crate::error::Result;
use crate::records::{PostTable, COLUMNS};

pub const EXPORT_FILENAME: &str = "hasil_scraping_facebook.xlsx";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01.
const UNIX_EPOCH_SERIAL: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Longest string a single cell can hold, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Cuts `value` to the cell limit on a char boundary.
fn cell_text(value: &str) -> &str {
    match value.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

fn excel_serial(time: &chrono::NaiveDateTime) -> f64 {
    time.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_SERIAL
}

/// Single-sheet workbook: a header row, then one row per post.
/// Null cells are left blank.
pub fn to_xlsx(table: &PostTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let datetime = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let sheet = workbook.add_worksheet();
    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    sheet.set_column_width(2, 20)?;

    for (i, record) in table.rows().iter().enumerate() {
        let row = i as u32 + 1;
        if let Some(page) = &record.page_name {
            sheet.write_string(row, 0, cell_text(page))?;
        }
        if let Some(text) = &record.text {
            sheet.write_string(row, 1, cell_text(text))?;
        }
        if let Some(time) = &record.time {
            sheet.write_number_with_format(row, 2, excel_serial(time), &datetime)?;
        }
        if let Some(url) = &record.url {
            sheet.write_string(row, 3, cell_text(url))?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(rows = table.len(), bytes = bytes.len(), "Workbook written");
    Ok(bytes)
}
