//! Minimal comma-delimited text codec for the results table and training data.
//!
//! Supports double-quoted fields (with `""` escapes) so feature names such as
//! `MDVP:Fo(Hz)` or free-text patient ids survive round trips. Embedded line
//! breaks inside quoted fields are not supported.

/// Field separator.
pub const DELIMITER: char = ',';

/// Split delimited text into rows of fields, skipping blank lines.
pub fn parse_rows(text: &str) -> Result<Vec<Vec<String>>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            parse_line(line.trim_end_matches('\r'))
                .map_err(|err| format!("line {}: {err}", idx + 1))
        })
        .collect()
}

/// Split one line into fields.
pub fn parse_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut quoted_field = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() && !quoted_field => {
                in_quotes = true;
                quoted_field = true;
            }
            DELIMITER if !in_quotes => {
                fields.push(std::mem::take(&mut field));
                quoted_field = false;
            }
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

/// Render one row of fields, quoting where needed.
pub fn format_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

fn escape_field(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Format a float so it parses back to the same value.
pub fn format_float(value: f64) -> String {
    // `Display` for f64 is the shortest representation that round-trips.
    format!("{value}")
}

/// Parse an optional numeric cell; empty and `nan`-like cells are `None`.
pub fn parse_optional_float(cell: &str) -> Result<Option<f64>, String> {
    let trimmed = cell.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
    {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid number {trimmed:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_round_trip() {
        let row = vec!["name", "MDVP:Fo(Hz)", "a,b", "say \"aah\""];
        let line = format_row(&row);
        assert_eq!(line, "name,MDVP:Fo(Hz),\"a,b\",\"say \"\"aah\"\"\"");
        assert_eq!(parse_line(&line).unwrap(), row);
    }

    #[test]
    fn empty_cells_are_kept_positionally() {
        assert_eq!(parse_line("454,,1").unwrap(), vec!["454", "", "1"]);
        assert_eq!(parse_line(",").unwrap(), vec!["", ""]);
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(parse_rows("a,b\n\"c,d\n").is_err());
    }

    #[test]
    fn optional_float_cells() {
        assert_eq!(parse_optional_float("").unwrap(), None);
        assert_eq!(parse_optional_float(" NaN ").unwrap(), None);
        assert_eq!(parse_optional_float("5.8296e-05").unwrap(), Some(5.8296e-05));
        assert!(parse_optional_float("abc").is_err());
        let value = 0.0057799999999999995;
        assert_eq!(
            parse_optional_float(&format_float(value)).unwrap(),
            Some(value)
        );
    }
}
