//! CSV スナップショット出力
//!
//! 列順は `record::COLUMNS` で固定。同期の成否とは無関係に、同期の前に書く。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::record::{Record, COLUMNS};

const SEPARATOR: char = ',';

fn needs_quotes(cell: &str) -> bool {
    cell.contains(SEPARATOR) || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", SEPARATOR)?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// ヘッダー行 + 1レコード1行。欠けているフィールドは空セル
pub fn write_csv<W: Write>(mut w: W, records: &[Record]) -> io::Result<()> {
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    write_row(&mut w, &header)?;

    for record in records {
        let row: Vec<String> = COLUMNS
            .iter()
            .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        write_row(&mut w, &row)?;
    }
    w.flush()
}

pub fn write_csv_file(path: &Path, records: &[Record]) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), records)?;
    info!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}
