//! Pass 1: label address assignment.
//!
//! Walks every line once, tracking the current address. Labels record the
//! address they fall on (or the `EQU`/`ORG` value). Expressions are only
//! validated, not evaluated, so forward references cost nothing. The
//! exceptions are `EQU`, `ORG`, and `DS` operands, which must produce a
//! value now and therefore see only labels defined above them.

use tec7_core::encoding::lookup_mnemonic;

use crate::cursor::{is_print, Cursor};
use crate::diag::{Diagnostics, ErrorCode, WarningCode, RESET, YELLOW};
use crate::expr::{check_expr_list, eval_add};
use crate::symbols::{Label, LabelTable};

pub(crate) fn run(lines: &[String], diags: &mut Diagnostics) -> LabelTable {
    let mut labels = LabelTable::new();
    let mut cur_addr: u8 = 0;
    for (index, line) in lines.iter().enumerate() {
        assign_line(line, index + 1, lines, &mut cur_addr, &mut labels, diags);
    }
    labels
}

#[allow(clippy::too_many_lines, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn assign_line(
    line: &str,
    line_no: usize,
    lines: &[String],
    cur_addr: &mut u8,
    labels: &mut LabelTable,
    diags: &mut Diagnostics,
) {
    let mut cur = Cursor::new(line);
    let mut label = String::new();
    if cur.is_name_start() {
        // A label always starts in column 0.
        label = cur.get_name();
        if let Some(previous) = labels.get(&label) {
            let context = previous_definition_context(&label, previous.line, lines);
            diags.error(
                ErrorCode::DuplicatedLabel,
                line_no,
                0,
                Some(cur.pos()),
                Some(context),
            );
        }
    } else if !cur.is_space_or_comment() {
        let suggestion = cur
            .peek()
            .filter(|b| is_print(*b))
            .map(|_| "ラベルは、英字または、'_'（アンダースコア）で始まる必要があります。".to_string());
        diags.error(ErrorCode::InvalidLabel, line_no, 0, None, suggestion);
        return;
    }

    let mut label_value = *cur_addr;
    cur.skip_space();
    if cur.is_name_start() {
        let name_beg = cur.pos();
        let inst = cur.get_name();
        match inst.as_str() {
            "EQU" => {
                let value_beg = cur.pos();
                let Some(value) = eval_add(&mut cur, line_no, &*labels, diags) else {
                    return;
                };
                if !(-256..=255).contains(&value) {
                    diags.warning(
                        WarningCode::ValueOutOfRange,
                        line_no,
                        value_beg,
                        Some(cur.pos() - value_beg),
                        Some(format!("範囲外の値: {value}")),
                    );
                }
                label_value = value as u8;
            }
            "ORG" => {
                let addr_beg = cur.pos();
                let Some(value) = eval_add(&mut cur, line_no, &*labels, diags) else {
                    return;
                };
                if value < i32::from(*cur_addr) {
                    diags.error(
                        ErrorCode::InvalidOrg,
                        line_no,
                        addr_beg,
                        Some(cur.pos() - addr_beg),
                        Some(format!(
                            "（現在のアドレス: {:03X}H, 指定されたアドレス: {:03X}H）",
                            *cur_addr,
                            value & 0xFF
                        )),
                    );
                    return;
                }
                label_value = value as u8;
                *cur_addr = value as u8;
            }
            "DS" => {
                let Some(value) = eval_add(&mut cur, line_no, &*labels, diags) else {
                    return;
                };
                *cur_addr = cur_addr.wrapping_add(value as u8);
            }
            "DC" => {
                let mut count: u8 = 0;
                if !check_expr_list(&mut cur, line_no, diags, &mut count) {
                    return;
                }
                *cur_addr = cur_addr.wrapping_add(count);
            }
            _ => {
                if let Some(spec) = lookup_mnemonic(&inst) {
                    *cur_addr = cur_addr.wrapping_add(spec.class.encoded_size());
                    // Operands are Pass 2's business.
                    cur.skip_to_end();
                } else {
                    let mut suggestion = format!("オペコード: {inst}");
                    if lookup_mnemonic(&label).is_some() {
                        suggestion.push_str(&format!(
                            "\nラベル（\"{label}\"）がオペコードと一致しています。\n\
                             ラベルのない行には、行頭に空白またはタブが必要です。"
                        ));
                    }
                    diags.error(
                        ErrorCode::UnknownInstruction,
                        line_no,
                        name_beg,
                        Some(cur.pos() - name_beg),
                        Some(suggestion),
                    );
                    return;
                }
            }
        }
    }

    if !label.is_empty() {
        labels.entry(label).or_insert(Label {
            value: label_value,
            line: line_no,
        });
    }
}

/// Builds the duplicate-label suggestion: the earlier definition with its
/// own line of context above and below, the label highlighted.
fn previous_definition_context(label: &str, def_line: usize, lines: &[String]) -> String {
    let mut out = format!("重複したラベル: \"{label}\"\n以前の定義\n");
    if def_line > 1 {
        out.push_str(&format!("{:>3}| {}\n", def_line - 1, lines[def_line - 2]));
    }
    let text = &lines[def_line - 1];
    let bytes = text.as_bytes();
    let mut end = 0;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    out.push_str(&format!(
        "{:>3}| {YELLOW}{}{RESET}{}",
        def_line,
        &text[..end],
        &text[end..]
    ));
    if def_line < lines.len() {
        out.push_str(&format!("\n{:>3}| {}", def_line + 1, lines[def_line]));
    }
    out
}
