//! Cell reference and text node helpers used by the XLSX parser

use quick_xml::Reader;
use quick_xml::events::Event;

/// Leading column letters of a cell reference ("AB12" -> "AB").
///
/// Only uppercase ASCII letters count; a reference that does not start with
/// one has no usable column.
pub fn column_letters(cell_ref: &str) -> Option<&str> {
    let end = cell_ref
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(cell_ref.len());
    if end == 0 {
        None
    } else {
        Some(&cell_ref[..end])
    }
}

/// Convert column letters to a 0-based index (A -> 0, Z -> 25, AA -> 26)
///
/// Returns `None` for non-letter input or an index that does not fit in `u32`.
pub fn col_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(ch as u32 - 'A' as u32 + 1)?;
    }

    Some(col - 1)
}

/// Highest column a worksheet can hold (`XFD`)
pub const MAX_COLUMN_INDEX: u32 = 16_383;

/// Column index of a full cell reference like "C7".
///
/// Columns past `XFD` are rejected.
pub fn parse_cell_column(cell_ref: &str) -> Option<u32> {
    column_letters(cell_ref)
        .and_then(col_to_index)
        .filter(|col| *col <= MAX_COLUMN_INDEX)
}

/// Read text content until the closing tag of the current element
pub fn read_text_node<R: std::io::BufRead>(
    reader: &mut Reader<R>,
) -> quick_xml::Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}
