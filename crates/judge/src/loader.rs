//! Binary and name-table file loaders.

use std::collections::HashMap;
use std::fs;

use thiserror::Error;

/// Labels read back from a name-table file, uppercase name to value.
pub type NameTable = HashMap<String, u8>;

/// A loaded machine-code image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinary {
    /// Load address of the first code byte.
    pub start: u8,
    /// The code bytes; the file's `size` field is its length.
    pub code: Vec<u8>,
}

/// Binary-file load failures. Fatal on first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The file could not be read at all.
    #[error("ファイルが開けませんでした （ファイルのパス: \"{0}\"）")]
    Open(String),
    /// Truncated or over-long payload.
    #[error("機械語ファイルの形式が不正です。")]
    MalformedBinary,
}

/// Reads a `.bin` file: `[start, size, code...]` with exactly `size` code
/// bytes and nothing after them.
pub fn read_binary(path: &str) -> Result<ProgramBinary, LoadError> {
    let data = fs::read(path).map_err(|_| LoadError::Open(path.to_string()))?;
    if data.len() < 2 || data.len() != 2 + usize::from(data[1]) {
        return Err(LoadError::MalformedBinary);
    }
    Ok(ProgramBinary {
        start: data[0],
        code: data[2..].to_vec(),
    })
}

/// Reads a `.nt` file. Per-line errors accumulate as `path:line: message`
/// strings; any error makes the whole load fail.
pub fn read_name_table(path: &str) -> Result<NameTable, Vec<String>> {
    let Ok(content) = fs::read_to_string(path) else {
        return Err(vec![format!(
            "ファイルが開けませんでした。（ファイルのパス: \"{path}\"）"
        )]);
    };
    let mut table = NameTable::new();
    let mut errors = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Err(message) = parse_line(line, &mut table) {
            errors.push(format!("{path}:{}: {message}", index + 1));
        }
    }
    if errors.is_empty() {
        Ok(table)
    } else {
        Err(errors)
    }
}

fn skip_space(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

fn parse_line(line: &str, table: &mut NameTable) -> Result<(), String> {
    let bytes = line.as_bytes();
    let mut idx = skip_space(bytes, 0);
    if idx >= bytes.len() {
        return Ok(());
    }
    if !(bytes[idx].is_ascii_alphabetic() || bytes[idx] == b'_') {
        return Err("ラベルが必要です。".into());
    }
    let mut label = String::new();
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        label.push(bytes[idx].to_ascii_uppercase() as char);
        idx += 1;
    }
    idx = skip_space(bytes, idx);
    if idx >= bytes.len() || bytes[idx] != b':' {
        return Err("':' が必要です。".into());
    }
    idx += 1;
    idx = skip_space(bytes, idx);
    if idx >= bytes.len() || !bytes[idx].is_ascii_digit() {
        return Err("値が必要です。".into());
    }
    let mut hex = false;
    let mut digits = String::new();
    while idx < bytes.len() && bytes[idx].is_ascii_hexdigit() {
        if !bytes[idx].is_ascii_digit() {
            hex = true;
        }
        digits.push(bytes[idx] as char);
        idx += 1;
    }
    if idx < bytes.len() && bytes[idx].to_ascii_uppercase() == b'H' {
        hex = true;
        idx += 1;
    } else if hex {
        return Err("'H' が必要です。".into());
    }
    let radix = if hex { 16 } else { 10 };
    let value = match u32::from_str_radix(&digits, radix) {
        #[allow(clippy::cast_possible_truncation)]
        Ok(v) if v <= i32::MAX as u32 => v as u8,
        _ => return Err(format!("値が大きすぎます。 （値: {digits}）")),
    };
    idx = skip_space(bytes, idx);
    if idx < bytes.len() {
        return Err(format!("名前表の形式が不正です。（行: \"{line}\"）"));
    }
    table.insert(label, value);
    Ok(())
}
