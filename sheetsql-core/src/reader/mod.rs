//! XLSX reader built on zip + quick-xml

use log::debug;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::error::{ImportError, Result};

pub mod parser_utils;
pub mod table;
pub mod xlsx_parser;

pub use table::{RawCell, SheetMatrix, SheetTable};
pub use xlsx_parser::{SheetEntry, XlsxReader};

/// Read one sheet of an XLSX file into a header/data table
pub fn read_sheet_table<P: AsRef<Path>>(path: P, sheet_index: usize) -> Result<SheetTable> {
    let path_ref = path.as_ref();

    let file = File::open(path_ref).map_err(|source| ImportError::Open {
        path: path_ref.to_path_buf(),
        source,
    })?;
    debug!("Reading sheet {} of {}", sheet_index, path_ref.display());

    read_sheet_table_from_reader(BufReader::new(file), sheet_index)
}

/// Same as [`read_sheet_table`] for an archive already in memory
pub fn read_sheet_table_from_bytes(bytes: &[u8], sheet_index: usize) -> Result<SheetTable> {
    read_sheet_table_from_reader(Cursor::new(bytes), sheet_index)
}

fn read_sheet_table_from_reader<R: Read + Seek>(reader: R, sheet_index: usize) -> Result<SheetTable> {
    let mut archive = ZipArchive::new(reader)?;
    let matrix = {
        let mut xlsx = XlsxReader::new(&mut archive)?;
        xlsx.read_sheet(sheet_index)?
    };
    // Archive released before any row is mapped
    drop(archive);

    Ok(matrix.into_table())
}
