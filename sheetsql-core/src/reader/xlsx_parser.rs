//! XML parsing for the parts of an XLSX archive needed to read one sheet

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use super::parser_utils::{parse_cell_column, read_text_node};
use super::table::{RawCell, SheetMatrix};
use crate::error::{ImportError, Result};

pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// A sheet declared in the workbook manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    /// Relationship id (`r:id`) pointing into the workbook relationships
    pub rel_id: Option<String>,
}

fn has_part<R: Read + Seek>(archive: &ZipArchive<R>, part: &str) -> bool {
    archive.file_names().any(|name| name == part)
}

fn ensure_part<R: Read + Seek>(archive: &ZipArchive<R>, part: &str) -> Result<()> {
    if has_part(archive, part) {
        Ok(())
    } else {
        Err(ImportError::MissingPart(part.to_string()))
    }
}

/// Value of the attribute with the given local name (namespace prefix ignored)
fn attr_value(e: &BytesStart, local_name: &[u8], part: &str) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == local_name {
            let value = attr.unescape_value().map_err(ImportError::xml(part))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Read the shared string table. A workbook without one has no shared strings.
pub fn extract_shared_strings(archive: &mut ZipArchive<impl Read + Seek>) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    if !has_part(archive, SHARED_STRINGS_PART) {
        return Ok(strings);
    }
    let ss_xml = archive.by_name(SHARED_STRINGS_PART)?;

    // No trimming: rich text runs carry their own spacing
    let mut reader = Reader::from_reader(BufReader::new(ss_xml));
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let to_err = ImportError::xml(SHARED_STRINGS_PART);

    loop {
        match reader.read_event_into(&mut buf).map_err(&to_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                current_string.push_str(&read_text_node(&mut reader).map_err(&to_err)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current_string));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!("Read {} shared strings", strings.len());
    Ok(strings)
}

/// Sheets declared in `xl/workbook.xml`, in workbook order
pub fn read_sheet_manifest(archive: &mut ZipArchive<impl Read + Seek>) -> Result<Vec<SheetEntry>> {
    ensure_part(archive, WORKBOOK_PART)?;
    let workbook_xml = archive.by_name(WORKBOOK_PART)?;
    let mut reader = Reader::from_reader(BufReader::new(workbook_xml));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut in_sheets = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(ImportError::xml(WORKBOOK_PART))?
        {
            Event::Start(e) if e.local_name().as_ref() == b"sheets" => in_sheets = true,
            Event::End(e) if e.local_name().as_ref() == b"sheets" => in_sheets = false,
            Event::Start(e) | Event::Empty(e)
                if in_sheets && e.local_name().as_ref() == b"sheet" =>
            {
                sheets.push(SheetEntry {
                    name: attr_value(&e, b"name", WORKBOOK_PART)?.unwrap_or_default(),
                    rel_id: attr_value(&e, b"id", WORKBOOK_PART)?,
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Relationship id -> target path from `xl/_rels/workbook.xml.rels`
pub fn read_relationships(
    archive: &mut ZipArchive<impl Read + Seek>,
) -> Result<HashMap<String, String>> {
    ensure_part(archive, WORKBOOK_RELS_PART)?;
    let rels_xml = archive.by_name(WORKBOOK_RELS_PART)?;
    let mut reader = Reader::from_reader(BufReader::new(rels_xml));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(ImportError::xml(WORKBOOK_RELS_PART))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id", WORKBOOK_RELS_PART)?;
                let target = attr_value(&e, b"Target", WORKBOOK_RELS_PART)?;
                if let (Some(id), Some(target)) = (id, target) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Archive path of the sheet at `index`
pub fn resolve_sheet_path(
    manifest: &[SheetEntry],
    rels: &HashMap<String, String>,
    index: usize,
) -> Result<String> {
    if manifest.is_empty() {
        return Err(ImportError::NoSheetsFound);
    }
    let entry = manifest
        .get(index)
        .ok_or(ImportError::SheetIndexOutOfRange {
            index,
            count: manifest.len(),
        })?;

    let target = entry
        .rel_id
        .as_ref()
        .and_then(|id| rels.get(id))
        .ok_or_else(|| ImportError::UnresolvableSheetPart {
            sheet: entry.name.clone(),
            rel_id: entry.rel_id.clone(),
        })?;

    // Targets are relative to xl/ unless given from the package root
    let target = target.trim_start_matches('/');
    if target.starts_with("xl/") {
        Ok(target.to_string())
    } else {
        Ok(format!("xl/{}", target))
    }
}

/// Parse `<sheetData>` rows of a worksheet part into raw cells
pub fn parse_sheet_rows(
    archive: &mut ZipArchive<impl Read + Seek>,
    path: &str,
    shared_strings: &[String],
) -> Result<Vec<Vec<RawCell>>> {
    ensure_part(archive, path)?;
    let sheet_xml = archive.by_name(path)?;
    let mut reader = Reader::from_reader(BufReader::new(sheet_xml));
    reader.config_mut().trim_text(true);
    let to_err = ImportError::xml(path);

    let mut buf = Vec::new();
    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    let mut in_sheet_data = false;
    let mut current_row: Option<Vec<RawCell>> = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(&to_err)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sheetData" => in_sheet_data = true,
                b"row" if in_sheet_data => current_row = Some(Vec::new()),
                b"c" if current_row.is_some() => {
                    let cell_ref = attr_value(&e, b"r", path)?;
                    let cell_type = attr_value(&e, b"t", path)?;
                    let value = parse_cell_contents(
                        &mut reader,
                        cell_type.as_deref(),
                        shared_strings,
                    )
                    .map_err(&to_err)?;
                    if let Some(row) = current_row.as_mut()
                        && let Some(col) = cell_column(cell_ref.as_deref())
                    {
                        row.push(RawCell::new(col, value));
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" if in_sheet_data => rows.push(Vec::new()),
                b"c" => {
                    if let Some(row) = current_row.as_mut()
                        && let Some(col) = cell_column(attr_value(&e, b"r", path)?.as_deref())
                    {
                        row.push(RawCell::new(col, String::new()));
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"row" => {
                    if let Some(row) = current_row.take() {
                        rows.push(row);
                    }
                }
                b"sheetData" => in_sheet_data = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} rows from {}", rows.len(), path);
    Ok(rows)
}

/// Column of a cell's `r` attribute; unusable references are skipped with a warning
fn cell_column(cell_ref: Option<&str>) -> Option<u32> {
    let cell_ref = cell_ref?;
    let col = parse_cell_column(cell_ref);
    if col.is_none() {
        warn!("Skipping cell with unusable reference '{}'", cell_ref);
    }
    col
}

/// Read a `<c>` element's children up to `</c>` and return the cell text
fn parse_cell_contents<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    cell_type: Option<&str>,
    shared_strings: &[String],
) -> quick_xml::Result<String> {
    let mut value = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"v" => {
                    let v_text = read_text_node(reader)?;
                    value = match cell_type {
                        Some("s") => resolve_shared_string(&v_text, shared_strings),
                        _ => v_text,
                    };
                }
                b"is" if cell_type == Some("inlineStr") => {
                    // Inline string can have multiple <t> tags
                    let mut is_text = String::new();
                    let mut is_buf = Vec::new();
                    loop {
                        match reader.read_event_into(&mut is_buf)? {
                            Event::Start(ee) if ee.local_name().as_ref() == b"t" => {
                                is_text.push_str(&read_text_node(reader)?);
                            }
                            Event::End(ee) if ee.local_name().as_ref() == b"is" => break,
                            Event::Eof => break,
                            _ => {}
                        }
                        is_buf.clear();
                    }
                    value = is_text;
                }
                _ => {
                    // Skip formulas and anything else
                    read_text_node(reader)?;
                }
            },
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(value)
}

fn resolve_shared_string(index: &str, shared_strings: &[String]) -> String {
    match index.trim().parse::<usize>() {
        Ok(idx) => match shared_strings.get(idx) {
            Some(s) => s.clone(),
            None => {
                warn!(
                    "Shared string index {} out of range ({} strings), using empty cell",
                    idx,
                    shared_strings.len()
                );
                String::new()
            }
        },
        Err(_) => {
            warn!("Invalid shared string index '{}', using empty cell", index);
            String::new()
        }
    }
}

/// Reader over one XLSX archive with its shared string table loaded
pub struct XlsxReader<'a, R: Read + Seek> {
    archive: &'a mut ZipArchive<R>,
    shared_strings: Vec<String>,
}

impl<'a, R: Read + Seek> XlsxReader<'a, R> {
    pub fn new(archive: &'a mut ZipArchive<R>) -> Result<Self> {
        let shared_strings = extract_shared_strings(archive)?;
        Ok(Self {
            archive,
            shared_strings,
        })
    }

    /// Read the sheet at `index` into a padded matrix
    pub fn read_sheet(&mut self, index: usize) -> Result<SheetMatrix> {
        let manifest = read_sheet_manifest(self.archive)?;
        if manifest.is_empty() {
            return Err(ImportError::NoSheetsFound);
        }
        if index >= manifest.len() {
            return Err(ImportError::SheetIndexOutOfRange {
                index,
                count: manifest.len(),
            });
        }

        let rels = read_relationships(self.archive)?;
        let path = resolve_sheet_path(&manifest, &rels, index)?;
        debug!("Sheet {} resolved to {}", index, path);

        let rows = parse_sheet_rows(self.archive, &path, &self.shared_strings)?;
        Ok(SheetMatrix::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn archive_with(parts: &[(&str, &str)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            for (name, content) in parts {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        ZipArchive::new(Cursor::new(buf)).unwrap()
    }

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Productos" sheetId="1" r:id="rId3"/><sheet name="Otra" sheetId="2" r:id="rId9"/></sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/data.xml"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    #[test]
    fn test_extract_shared_strings_rich_text() {
        let mut archive = archive_with(&[(
            SHARED_STRINGS_PART,
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3">
<si><t>Producto</t></si>
<si><r><t xml:space="preserve">Caf</t></r><r><rPr><b/></rPr><t>é &amp; Té</t></r></si>
<si><t/></si>
</sst>"#,
        )]);

        let strings = extract_shared_strings(&mut archive).unwrap();
        assert_eq!(strings, vec!["Producto", "Café & Té", ""]);
    }

    #[test]
    fn test_missing_shared_strings_is_empty() {
        let mut archive = archive_with(&[(WORKBOOK_PART, WORKBOOK)]);
        assert!(extract_shared_strings(&mut archive).unwrap().is_empty());
    }

    #[test]
    fn test_manifest_and_relationships() {
        let mut archive = archive_with(&[(WORKBOOK_PART, WORKBOOK), (WORKBOOK_RELS_PART, RELS)]);

        let manifest = read_sheet_manifest(&mut archive).unwrap();
        assert_eq!(
            manifest,
            vec![
                SheetEntry {
                    name: "Productos".into(),
                    rel_id: Some("rId3".into())
                },
                SheetEntry {
                    name: "Otra".into(),
                    rel_id: Some("rId9".into())
                },
            ]
        );

        let rels = read_relationships(&mut archive).unwrap();
        assert_eq!(rels.get("rId1").map(String::as_str), Some("styles.xml"));

        assert_eq!(
            resolve_sheet_path(&manifest, &rels, 0).unwrap(),
            "xl/worksheets/data.xml"
        );
        assert!(matches!(
            resolve_sheet_path(&manifest, &rels, 1),
            Err(ImportError::UnresolvableSheetPart { rel_id: Some(ref id), .. }) if id == "rId9"
        ));
        assert!(matches!(
            resolve_sheet_path(&manifest, &rels, 2),
            Err(ImportError::SheetIndexOutOfRange { index: 2, count: 2 })
        ));
        assert!(matches!(
            resolve_sheet_path(&[], &rels, 0),
            Err(ImportError::NoSheetsFound)
        ));
    }

    #[test]
    fn test_relative_target_gets_xl_prefix() {
        let manifest = vec![SheetEntry {
            name: "S".into(),
            rel_id: Some("rId1".into()),
        }];
        let rels = HashMap::from([("rId1".to_string(), "worksheets/sheet1.xml".to_string())]);
        assert_eq!(
            resolve_sheet_path(&manifest, &rels, 0).unwrap(),
            "xl/worksheets/sheet1.xml"
        );

        let missing_id = vec![SheetEntry {
            name: "S".into(),
            rel_id: None,
        }];
        assert!(matches!(
            resolve_sheet_path(&missing_id, &rels, 0),
            Err(ImportError::UnresolvableSheetPart { rel_id: None, .. })
        ));
    }

    #[test]
    fn test_missing_workbook_part() {
        let mut archive = archive_with(&[(WORKBOOK_RELS_PART, RELS)]);
        assert!(matches!(
            read_sheet_manifest(&mut archive),
            Err(ImportError::MissingPart(ref part)) if part == WORKBOOK_PART
        ));
    }

    #[test]
    fn test_parse_sheet_rows() {
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:D3"/>
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Inline</t></is></c><c r="B2"><v>19.99</v></c><c r="C2" t="str"><f>B2*2</f><v>39.98</v></c><c r="D2" s="1"/></row>
<row r="3"/>
<row r="4"><c r="B4" t="s"><v>99</v></c><c t="s"><v>0</v></c></row>
</sheetData>
</worksheet>"#;
        let mut archive = archive_with(&[("xl/worksheets/sheet1.xml", sheet)]);
        let shared = vec!["Producto".to_string(), "Precio".to_string()];

        let rows = parse_sheet_rows(&mut archive, "xl/worksheets/sheet1.xml", &shared).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec![RawCell::new(0, "Producto"), RawCell::new(2, "Precio")]);
        assert_eq!(
            rows[1],
            vec![
                RawCell::new(0, "Inline"),
                RawCell::new(1, "19.99"),
                RawCell::new(2, "39.98"),
                RawCell::new(3, ""),
            ]
        );
        assert!(rows[2].is_empty());
        // Out-of-range shared string degrades to empty; cell without reference is skipped
        assert_eq!(rows[3], vec![RawCell::new(1, "")]);
    }

    #[test]
    fn test_cells_past_last_column_are_skipped() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1"><v>1</v></c><c r="XFD1"><v>2</v></c><c r="XFE1"><v>3</v></c><c r="ZZZZZZ1"/></row>
</sheetData></worksheet>"#;
        let mut archive = archive_with(&[("xl/worksheets/sheet1.xml", sheet)]);

        let rows = parse_sheet_rows(&mut archive, "xl/worksheets/sheet1.xml", &[]).unwrap();
        assert_eq!(rows[0], vec![RawCell::new(0, "1"), RawCell::new(16_383, "2")]);

        let matrix = SheetMatrix::from_rows(rows);
        assert_eq!(matrix.width(), 16_384);
    }

    #[test]
    fn test_reader_read_sheet() {
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>5</v></c></row>
</sheetData></worksheet>"#;
        let mut archive = archive_with(&[
            (WORKBOOK_PART, WORKBOOK),
            (WORKBOOK_RELS_PART, RELS),
            ("xl/worksheets/data.xml", sheet),
            (
                SHARED_STRINGS_PART,
                "<sst><si><t>Producto</t></si><si><t>Stock:Tienda</t></si><si><t>Widget</t></si></sst>",
            ),
        ]);

        let mut reader = XlsxReader::new(&mut archive).unwrap();
        let matrix = reader.read_sheet(0).unwrap();
        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.rows()[1], vec!["Widget", "5"]);

        assert!(matches!(
            reader.read_sheet(5),
            Err(ImportError::SheetIndexOutOfRange { index: 5, count: 2 })
        ));
    }
}
