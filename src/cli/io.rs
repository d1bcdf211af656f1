//! JSON line I/O for the CLI
//!
//! - Input: one JSON object per line
//! - Output: one JSON response per line
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Iterate over the non-blank lines of `input` as JSON documents
pub fn read_requests<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<Value>> {
    input.lines().filter_map(|line| match line {
        Err(e) => Some(Err(CliError::from(e))),
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str(&line).map_err(CliError::from)),
    })
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(out, &response)
}

/// Write an error response
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(out, &response)
}

fn write_line<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_skips_blank_lines() {
        let input = "{\"a\":1}\n\n   \n{\"b\":2}\n";
        let docs: Vec<Value> = read_requests(input.as_bytes()).map(|r| r.unwrap()).collect();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_read_reports_bad_json() {
        let mut docs = read_requests("{oops\n".as_bytes());
        assert!(docs.next().unwrap().is_err());
    }

    #[test]
    fn test_write_responses() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"x": 1})).unwrap();
        write_error(&mut out, "FIELD_UNKNOWN", "bad").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0], json!({"status": "ok", "data": {"x": 1}}));
        assert_eq!(lines[1]["code"], "FIELD_UNKNOWN");
    }
}
