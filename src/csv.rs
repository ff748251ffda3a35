// src/csv.rs
use std::io::{self, Write};
use std::mem::take;

/* ---------------- Parsing ---------------- */

/// Quote-aware CSV reader. Tolerates CRLF, doubled quotes, and quoted newlines.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = s!();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) { chars.next(); }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // trailing row without newline, even if quotes were unterminated
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first { write!(w, "{}", sep)?; } else { first = false; }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &[s!("Dallas, TX"), s!("'6-3"), s!("say \"hi\""), s!("NA")], ',').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\"Dallas, TX\",'6-3,\"say \"\"hi\"\"\",NA\n");
    }

    #[test]
    fn reads_quoted_fields_and_crlf() {
        let rows = parse_rows("a,\"b, c\"\r\n\"x \"\"y\"\"\",\"line\nbreak\"\n\n", ',');
        assert_eq!(rows, vec![
            vec![s!("a"), s!("b, c")],
            vec![s!("x \"y\""), s!("line\nbreak")],
        ]);
    }

    #[test]
    fn last_row_without_newline() {
        assert_eq!(parse_rows("h1,h2\n1,", ','), vec![vec![s!("h1"), s!("h2")], vec![s!("1"), s!()]]);
    }
}
