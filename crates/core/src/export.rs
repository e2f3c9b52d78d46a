//! MF journal CSV serialization.

use crate::journal::{JournalRow, MF_COLUMNS};

/// Render rows as an MF-importable CSV: fixed Japanese header, CRLF line
/// endings, fields quoted only when they contain a delimiter, quote, or
/// line break.
pub fn to_mf_csv(rows: &[JournalRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    let header: Vec<String> = MF_COLUMNS
        .iter()
        .map(|(_, label)| escape(label))
        .collect();
    lines.push(header.join(","));

    for row in rows {
        let cells: Vec<String> = MF_COLUMNS
            .iter()
            .map(|(field, _)| match field {
                Some(f) => escape(&row.get(*f)),
                None => row.seq_no.to_string(),
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\r\n")
}

fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
