//! Label table and name-table formatting.

use std::collections::HashMap;

/// A defined label: its 8-bit value and the line that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// Assigned value (an address, or an `EQU` constant).
    pub value: u8,
    /// 1-indexed defining source line, used by duplicate diagnostics.
    pub line: usize,
}

/// Mapping from uppercase label name to its definition.
pub type LabelTable = HashMap<String, Label>;

/// Formats the name-table artifact: one `NAME:` padded to 8 columns, a
/// space, and the value as `0XXH` per label. Rows are sorted by name so
/// the artifact is reproducible.
#[must_use]
pub fn format_name_table(labels: &LabelTable) -> String {
    let mut names: Vec<&String> = labels.keys().collect();
    names.sort();
    let mut out = String::new();
    for name in names {
        let value = labels[name].value;
        out.push_str(&format!("{:<8} 0{value:02X}H\n", format!("{name}:")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{format_name_table, Label, LabelTable};

    #[test]
    fn rows_are_padded_and_sorted() {
        let mut labels = LabelTable::new();
        labels.insert("LOOP".into(), Label { value: 0x10, line: 3 });
        labels.insert("A".into(), Label { value: 0xFF, line: 1 });
        labels.insert("LONGNAME1".into(), Label { value: 2, line: 2 });
        assert_eq!(
            format_name_table(&labels),
            "A:       0FFH\nLONGNAME1: 002H\nLOOP:    010H\n"
        );
    }

    #[test]
    fn empty_table_formats_to_nothing() {
        assert_eq!(format_name_table(&LabelTable::new()), "");
    }
}
