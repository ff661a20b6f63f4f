//! Pass 2: code emission.
//!
//! Re-parses every line with the label table complete, evaluates operand
//! expressions, and emits machine code into the 256-byte image. Emission
//! wraps modulo 256; a separate monotone position counter feeds the
//! binary-too-large warning so wrap-around is still caught.

use tec7_core::decoder::{AddrMode, Gr};
use tec7_core::encoding::{lookup_mnemonic, EncodingClass, OpcodeSpec};
use tec7_core::ROM_START;

use crate::assembler::ProgramImage;
use crate::cursor::{is_print, Cursor};
use crate::diag::{Diagnostics, ErrorCode, WarningCode};
use crate::expr::{check_add, eval_add};
use crate::symbols::LabelTable;

pub(crate) fn run(lines: &[String], labels: &LabelTable, diags: &mut Diagnostics) -> ProgramImage {
    let mut emitter = Emitter::default();
    for (index, line) in lines.iter().enumerate() {
        encode_line(line, index + 1, labels, &mut emitter, diags);
    }
    if emitter.position > u32::from(ROM_START) {
        diags.warning_uncited(
            WarningCode::BinaryTooLarge,
            Some(format!(
                "プログラムは、{:03X}H番地まで使用しています。\n\
                 {ROM_START:03X}H番地以降はROM領域のため、プログラムを書き込めません。",
                (emitter.position - 1) & 0xFF
            )),
        );
    }
    ProgramImage {
        start: emitter.start,
        size: emitter.cur_addr.wrapping_sub(emitter.start),
        bytes: emitter.bytes,
    }
}

/// The image under construction.
struct Emitter {
    bytes: [u8; 256],
    start: u8,
    cur_addr: u8,
    /// Monotone mirror of `cur_addr`; does not wrap.
    position: u32,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            bytes: [0; 256],
            start: 0,
            cur_addr: 0,
            position: 0,
        }
    }
}

impl Emitter {
    fn emit(&mut self, byte: u8) {
        self.bytes[usize::from(self.cur_addr)] = byte;
        self.cur_addr = self.cur_addr.wrapping_add(1);
        self.position += 1;
    }
}

fn encode_line(
    line: &str,
    line_no: usize,
    labels: &LabelTable,
    emitter: &mut Emitter,
    diags: &mut Diagnostics,
) {
    let mut cur = Cursor::new(line);
    if cur.is_name_start() {
        cur.skip_name();
    }
    cur.skip_space();
    if cur.is_name_start() {
        let name_beg = cur.pos();
        let inst = cur.get_name();
        if !encode_statement(&inst, name_beg, &mut cur, line_no, labels, emitter, diags) {
            return;
        }
    }
    cur.skip_space_or_comment();
    if !cur.at_end() {
        diags.error(ErrorCode::InvalidOperand, line_no, cur.pos(), None, None);
    }
}

#[allow(clippy::too_many_arguments, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_statement(
    inst: &str,
    name_beg: usize,
    cur: &mut Cursor<'_>,
    line_no: usize,
    labels: &LabelTable,
    emitter: &mut Emitter,
    diags: &mut Diagnostics,
) -> bool {
    match inst {
        // Fully handled in Pass 1; only the syntax is re-walked.
        "EQU" => check_add(cur, line_no, diags),
        "ORG" => {
            let addr_beg = cur.pos();
            let Some(value) = eval_add(cur, line_no, labels, diags) else {
                return false;
            };
            if value < i32::from(emitter.cur_addr) {
                diags.error(
                    ErrorCode::InvalidOrg,
                    line_no,
                    addr_beg,
                    Some(cur.pos() - addr_beg),
                    Some(format!(
                        "（現在のアドレス: {:03X}H, 指定されたアドレス: {:03X}H）",
                        emitter.cur_addr,
                        value & 0xFF
                    )),
                );
                return false;
            }
            if emitter.cur_addr == 0 {
                // No code emitted yet: move the start address.
                emitter.start = value as u8;
                emitter.cur_addr = value as u8;
                emitter.position = u32::from(value as u8);
            } else {
                let target = value as u8;
                while emitter.cur_addr != target {
                    emitter.emit(0);
                }
            }
            true
        }
        "DS" => {
            let Some(value) = eval_add(cur, line_no, labels, diags) else {
                return false;
            };
            for _ in 0..value.max(0) {
                emitter.emit(0);
            }
            true
        }
        "DC" => dc_list(cur, line_no, labels, emitter, diags),
        _ => match lookup_mnemonic(inst) {
            Some(spec) => encode_instruction(spec, cur, line_no, labels, emitter, diags),
            // Unreachable when Pass 1 succeeded; report rather than panic.
            None => {
                diags.error(
                    ErrorCode::UnknownInstruction,
                    line_no,
                    name_beg,
                    Some(cur.pos() - name_beg),
                    Some(format!("オペコード: {inst}")),
                );
                false
            }
        },
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn encode_instruction(
    spec: &OpcodeSpec,
    cur: &mut Cursor<'_>,
    line_no: usize,
    labels: &LabelTable,
    emitter: &mut Emitter,
    diags: &mut Diagnostics,
) -> bool {
    match spec.class {
        EncodingClass::Implied => {
            emitter.emit(spec.base);
            true
        }
        EncodingClass::RegisterOnly => {
            cur.skip_space();
            let Some(gr) = get_reg(cur, line_no, diags) else {
                return false;
            };
            emitter.emit(spec.base | gr.field_bits());
            true
        }
        EncodingClass::PortIo => {
            cur.skip_space();
            let Some(gr) = get_reg(cur, line_no, diags) else {
                return false;
            };
            cur.skip_space();
            if !cur.eat(b',') {
                let suggestion = cur
                    .at_end()
                    .then(|| format!("{}命令は、IOアドレスを指定する必要があります。", spec.mnemonic));
                diags.error(ErrorCode::CommaExpected, line_no, cur.pos(), None, suggestion);
                return false;
            }
            let addr_beg = cur.pos();
            let Some(value) = eval_add(cur, line_no, labels, diags) else {
                return false;
            };
            if !(0..0x10).contains(&value) {
                diags.warning(
                    WarningCode::IoAddressOutOfRange,
                    line_no,
                    addr_beg,
                    Some(cur.pos() - addr_beg),
                    Some(format!("範囲外のIOアドレス: {:03X}H", value & 0xFF)),
                );
            }
            emitter.emit(spec.base | gr.field_bits());
            emitter.emit(value as u8);
            true
        }
        EncodingClass::RegisterMemory => {
            cur.skip_space();
            let Some(gr) = get_reg(cur, line_no, diags) else {
                return false;
            };
            cur.skip_space();
            if !cur.eat(b',') {
                diags.error(ErrorCode::CommaExpected, line_no, cur.pos(), None, None);
                return false;
            }
            cur.skip_space();
            let mode;
            let addr;
            if cur.eat(b'#') {
                mode = AddrMode::Immediate;
                let Some(value) = get_address(cur, line_no, labels, diags) else {
                    return false;
                };
                addr = value;
            } else {
                let Some(value) = get_address(cur, line_no, labels, diags) else {
                    return false;
                };
                addr = value;
                cur.skip_space();
                if cur.eat(b',') {
                    cur.skip_space();
                    let Some(index) = get_index_reg(cur, line_no, diags) else {
                        return false;
                    };
                    mode = index;
                } else {
                    mode = AddrMode::Direct;
                }
            }
            emitter.emit(spec.base | gr.field_bits() | mode.field_bits());
            emitter.emit(addr);
            true
        }
        EncodingClass::Store => {
            cur.skip_space();
            let Some(gr) = get_reg(cur, line_no, diags) else {
                return false;
            };
            cur.skip_space();
            if !cur.eat(b',') {
                diags.error(ErrorCode::CommaExpected, line_no, cur.pos(), None, None);
                return false;
            }
            cur.skip_space();
            if cur.eat(b'#') {
                diags.error(ErrorCode::InvalidImmediate, line_no, cur.pos() - 1, None, None);
                return false;
            }
            let addr_beg = cur.pos();
            let Some(addr) = get_address(cur, line_no, labels, diags) else {
                return false;
            };
            let addr_len = cur.pos() - addr_beg;
            cur.skip_space();
            let mut mode = AddrMode::Direct;
            if cur.eat(b',') {
                cur.skip_space();
                let Some(index) = get_index_reg(cur, line_no, diags) else {
                    return false;
                };
                mode = index;
            } else if addr >= ROM_START {
                diags.warning(
                    WarningCode::WritingToRom,
                    line_no,
                    addr_beg,
                    Some(addr_len),
                    Some(format!(
                        "書き込み先アドレスとして、{addr:03X}H番地が指定されています。\n\
                         {ROM_START:03X}H番地以降はROM領域のため、\
                         この命令を実行しても主記憶上の値は変更されません。"
                    )),
                );
            }
            emitter.emit(spec.base | gr.field_bits() | mode.field_bits());
            emitter.emit(addr);
            true
        }
        EncodingClass::Jump => {
            let Some(addr) = get_address(cur, line_no, labels, diags) else {
                return false;
            };
            cur.skip_space();
            let mut mode = AddrMode::Direct;
            if cur.eat(b',') {
                cur.skip_space();
                let Some(index) = get_index_reg(cur, line_no, diags) else {
                    return false;
                };
                mode = index;
            }
            emitter.emit(spec.base | mode.field_bits());
            emitter.emit(addr);
            true
        }
    }
}

fn get_reg(cur: &mut Cursor<'_>, line_no: usize, diags: &mut Diagnostics) -> Option<Gr> {
    if !cur.is_name_start() {
        diags.error(ErrorCode::RegisterExpected, line_no, cur.pos(), None, None);
        return None;
    }
    let beg = cur.pos();
    let name = cur.get_name();
    match name.as_str() {
        "G0" => Some(Gr::G0),
        "G1" => Some(Gr::G1),
        "G2" => Some(Gr::G2),
        "SP" => Some(Gr::Sp),
        _ => {
            diags.error(
                ErrorCode::InvalidRegister,
                line_no,
                beg,
                Some(cur.pos() - beg),
                Some(format!("存在しないレジスタ名: \"{name}\"")),
            );
            None
        }
    }
}

fn get_index_reg(cur: &mut Cursor<'_>, line_no: usize, diags: &mut Diagnostics) -> Option<AddrMode> {
    if !cur.is_name_start() {
        diags.error(ErrorCode::IndexRegisterExpected, line_no, cur.pos(), None, None);
        return None;
    }
    let beg = cur.pos();
    let name = cur.get_name();
    match name.as_str() {
        "G1" => Some(AddrMode::G1Indexed),
        "G2" => Some(AddrMode::G2Indexed),
        _ => {
            let mut message = format!("存在しないインデクスレジスタ名: \"{name}\"");
            if name == "G0" || name == "SP" {
                message.push_str("\nインデクスレジスタとして使用できるのは、G1・G2のみです。");
            }
            diags.error(
                ErrorCode::InvalidIndexRegister,
                line_no,
                beg,
                Some(cur.pos() - beg),
                Some(message),
            );
            None
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn get_address(
    cur: &mut Cursor<'_>,
    line_no: usize,
    labels: &LabelTable,
    diags: &mut Diagnostics,
) -> Option<u8> {
    let beg = cur.pos();
    let value = eval_add(cur, line_no, labels, diags)?;
    if !(-128..=255).contains(&value) {
        diags.warning(
            WarningCode::AddressOutOfRange,
            line_no,
            beg,
            Some(cur.pos() - beg),
            Some(format!("範囲外のアドレス: {value}")),
        );
    }
    Some(value as u8)
}

fn dc_list(
    cur: &mut Cursor<'_>,
    line_no: usize,
    labels: &LabelTable,
    emitter: &mut Emitter,
    diags: &mut Diagnostics,
) -> bool {
    if !dc_expr(cur, line_no, labels, emitter, diags) {
        return false;
    }
    loop {
        cur.skip_space();
        if cur.eat(b',') {
            if !dc_expr(cur, line_no, labels, emitter, diags) {
                return false;
            }
        } else {
            break;
        }
    }
    true
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn dc_expr(
    cur: &mut Cursor<'_>,
    line_no: usize,
    labels: &LabelTable,
    emitter: &mut Emitter,
    diags: &mut Diagnostics,
) -> bool {
    cur.skip_space();
    let beg = cur.pos();
    if cur.eat(b'"') {
        while let Some(b) = cur.peek() {
            if !is_print(b) || b == b'"' {
                break;
            }
            emitter.emit(b);
            cur.advance();
        }
        if !cur.eat(b'"') {
            diags.error(
                ErrorCode::DoubleQuoteExpected,
                line_no,
                beg,
                Some(cur.pos() - beg),
                None,
            );
            return false;
        }
    } else {
        let value_beg = cur.pos();
        let Some(value) = eval_add(cur, line_no, labels, diags) else {
            return false;
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
        emitter.emit(value as u8);
    }
    true
}
