//! Merged regions of OpenDocument spreadsheets
//!
//! ODS keeps every sheet in `content.xml`; a merge is a `table:table-cell` carrying
//! `number-columns-spanned` / `number-rows-spanned`.

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

/// Merged regions of one sheet, read from the archive's `content.xml`
pub fn extract_merged_cells_from_ods(
    archive: &mut ZipArchive<impl Read + Seek>,
    sheet_name: &str,
) -> Result<Vec<(u32, u32, u32, u32)>> {
    match archive.by_name("content.xml") {
        Ok(content) => merged_cells_in_content(BufReader::new(content), sheet_name),
        Err(_) => Ok(Vec::new()),
    }
}

fn merged_cells_in_content<R: BufRead>(
    content: R,
    sheet_name: &str,
) -> Result<Vec<(u32, u32, u32, u32)>> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut cursor = Cursor {
        sheet_name,
        in_sheet: false,
        row: 0,
        col: 0,
        rows_repeated: 1,
        merged_cells: Vec::new(),
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if !cursor.open(&e, false) {
                    break;
                }
            }
            Ok(Event::Empty(e)) => {
                if !cursor.open(&e, true) {
                    break;
                }
            }
            Ok(Event::End(e)) if cursor.in_sheet => match e.name().as_ref() {
                b"table:table-row" => cursor.row += cursor.rows_repeated,
                b"table:table" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cursor.merged_cells)
}

/// Position inside the table being scanned
struct Cursor<'a> {
    sheet_name: &'a str,
    in_sheet: bool,
    row: u32,
    col: u32,
    rows_repeated: u32,
    merged_cells: Vec<(u32, u32, u32, u32)>,
}

impl Cursor<'_> {
    /// Returns false once the wanted table is behind us
    fn open(&mut self, element: &BytesStart, self_closing: bool) -> bool {
        match element.name().as_ref() {
            b"table:table" => {
                if self.in_sheet {
                    return false;
                }
                self.in_sheet = attr_text(element, b"table:name").as_deref() == Some(self.sheet_name);
            }
            b"table:table-row" if self.in_sheet => {
                self.col = 0;
                self.rows_repeated = attr_u32(element, b"table:number-rows-repeated").unwrap_or(1);
                if self_closing {
                    self.row += self.rows_repeated;
                }
            }
            b"table:table-cell" | b"table:covered-table-cell" if self.in_sheet => {
                let cols = attr_u32(element, b"table:number-columns-spanned").unwrap_or(1);
                let rows = attr_u32(element, b"table:number-rows-spanned").unwrap_or(1);
                if cols > 1 || rows > 1 {
                    self.merged_cells
                        .push((self.row, self.col, self.row + rows - 1, self.col + cols - 1));
                }
                self.col += attr_u32(element, b"table:number-columns-repeated").unwrap_or(1);
            }
            _ => {}
        }
        true
    }
}

fn attr_text(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn attr_u32(element: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_text(element, key)?.parse().ok()
}
