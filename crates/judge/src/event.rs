//! Scenario event language.
//!
//! The judge reads a line-oriented script from stdin and compiles it into
//! an ordered event list. `<expr>` positions accept a small expression
//! sublanguage over unsigned 8-bit wrapping arithmetic: `+ - * /`,
//! parentheses, unary sign, decimal or `H`-suffixed hex numerals, `'c'`
//! character literals, and labels from the name table. Parse errors
//! accumulate; the judge refuses to run if any occurred. `$END` stops
//! reading, and a final `$WAIT STOP` is always appended.

use tec7_core::{Flag, Reg, STATES_PER_SEC};

use crate::loader::NameTable;
use crate::printer::OutputMode;

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `REG = <expr>`.
    SetReg {
        /// Target register.
        reg: Reg,
        /// Value to assign.
        value: u8,
    },
    /// `FLG = 0|1`.
    SetFlag {
        /// Target flag.
        flag: Flag,
        /// Value to assign.
        value: bool,
    },
    /// `[addr] = <expr>`.
    SetMem {
        /// Target address.
        addr: u8,
        /// Value to poke.
        value: u8,
    },
    /// `$DATA-SW <expr>`.
    SetDataSwitch {
        /// New data-switch value.
        value: u8,
    },
    /// `$RUN`.
    Run,
    /// `$STOP`.
    Stop,
    /// `$RESET`.
    Reset,
    /// `$SERIAL "text" | byte,...`: queue serial input bytes.
    Serial {
        /// Bytes appended to the serial-input queue.
        bytes: Vec<u8>,
    },
    /// `$WAIT STATES|MS|SEC n`, already converted to states.
    WaitStates {
        /// Cycle budget to run for.
        states: u64,
    },
    /// `$WAIT SERIAL`.
    WaitSerial,
    /// `$WAIT STOP`.
    WaitStop,
    /// `$WRITE`: raise the console interrupt.
    Write,
    /// `$ANALOG CH<n> <float>(V|mV)`, already quantised to 8 bits.
    Analog {
        /// ADC channel, `0..4`.
        channel: u8,
        /// Quantised level.
        value: u8,
    },
    /// `$PARALLEL <expr>`.
    WriteParallel {
        /// New parallel-input value.
        value: u8,
    },
    /// `$SERIAL-MODE <mode>`.
    SetSerialMode {
        /// New serial-stream encoding.
        mode: OutputMode,
    },
    /// `$PRINT-MODE <mode>`.
    SetPrintMode {
        /// New print-stream encoding.
        mode: OutputMode,
    },
    /// `$PRINT <reg>`.
    PrintReg {
        /// Register to sample.
        reg: Reg,
    },
    /// `$PRINT <flag>`.
    PrintFlag {
        /// Flag to sample.
        flag: Flag,
    },
    /// `$PRINT [addr]`.
    PrintMem {
        /// Address to sample.
        addr: u8,
    },
    /// `$PRINT PARALLEL`.
    PrintParallel,
    /// `$PRINT EXT-PARALLEL`.
    PrintExtParallel,
    /// `$PRINT BUZ`.
    PrintBuzzer,
    /// `$PRINT SPK`.
    PrintSpeaker,
    /// `$PRINT RUN`.
    PrintRun,
}

/// Parses a whole scenario script. On failure returns the accumulated
/// error lines, each already carrying its stderr prefix.
pub fn parse_scenario(input: &str, names: &NameTable) -> Result<Vec<Event>, Vec<String>> {
    let mut parser = Parser {
        names,
        errors: Vec::new(),
    };
    let mut events = Vec::new();
    for line in input.lines() {
        if !parser.read_line(line, &mut events) {
            break;
        }
    }
    // Scripts always end by running the program out.
    events.push(Event::WaitStop);
    if parser.errors.is_empty() {
        Ok(events)
    } else {
        Err(parser.errors)
    }
}

const fn is_print(byte: u8) -> bool {
    byte >= 0x20 && byte <= 0x7E
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(line: &'a str) -> Self {
        Self {
            bytes: line.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    const fn advance(&mut self) {
        self.pos += 1;
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn skip_space_or_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b';' {
                self.pos = self.bytes.len();
                break;
            }
            if !b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn is_digit(&self) -> bool {
        matches!(self.peek(), Some(b) if b.is_ascii_digit())
    }

    fn is_label_start(&self) -> bool {
        matches!(self.peek(), Some(b) if b.is_ascii_alphabetic() || b == b'_')
    }

    fn is_label_char(&self) -> bool {
        matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_')
    }

    /// Command/argument word: letters to start, then letters, digits,
    /// `-`, or `_`.
    fn get_word(&mut self) -> Option<String> {
        self.skip_space_or_comment();
        if !self.is_label_start() {
            return None;
        }
        let mut word = String::new();
        loop {
            word.push(self.bytes[self.pos].to_ascii_uppercase() as char);
            self.pos += 1;
            match self.peek() {
                Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' => {}
                _ => break,
            }
        }
        Some(word)
    }
}

struct Parser<'a> {
    names: &'a NameTable,
    errors: Vec<String>,
}

impl Parser<'_> {
    fn input_error(&mut self, message: impl Into<String>) {
        self.errors.push(format!("入力: {}", message.into()));
    }

    /// Returns `false` on `$END` to stop reading.
    #[allow(clippy::too_many_lines)]
    fn read_line(&mut self, line: &str, events: &mut Vec<Event>) -> bool {
        let mut cur = Cursor::new(line);
        if cur.eat(b'$') {
            let Some(command) = cur.get_word() else {
                self.input_error("コマンドが必要です。");
                return true;
            };
            match command.as_str() {
                "RUN" => events.push(Event::Run),
                "STOP" => events.push(Event::Stop),
                "RESET" => events.push(Event::Reset),
                "WRITE" => events.push(Event::Write),
                "END" => return false,
                "WAIT" => match self.parse_wait(&mut cur) {
                    Some(event) => events.push(event),
                    None => return true,
                },
                "DATA-SW" => match self.get_add(&mut cur) {
                    Some(value) => events.push(Event::SetDataSwitch { value }),
                    None => return true,
                },
                "PARALLEL" => match self.get_add(&mut cur) {
                    Some(value) => events.push(Event::WriteParallel { value }),
                    None => return true,
                },
                "SERIAL-MODE" | "PRINT-MODE" => match self.parse_mode(&mut cur) {
                    Some(mode) => events.push(if command == "SERIAL-MODE" {
                        Event::SetSerialMode { mode }
                    } else {
                        Event::SetPrintMode { mode }
                    }),
                    None => return true,
                },
                "PRINT" => match self.parse_print(&mut cur) {
                    Some(event) => events.push(event),
                    None => return true,
                },
                "SERIAL" => match self.parse_serial(&mut cur) {
                    Some(event) => events.push(event),
                    None => return true,
                },
                "ANALOG" => match self.parse_analog(&mut cur) {
                    Some(event) => events.push(event),
                    None => return true,
                },
                _ => {
                    self.input_error(format!("不正なコマンドです。（コマンド名: \"{command}\"）"));
                    return true;
                }
            }
        } else if cur.eat(b'[') {
            let Some(addr) = self.get_add(&mut cur) else {
                return true;
            };
            if !self.expect_rbracket(&mut cur) || !self.expect_eq(&mut cur) {
                return true;
            }
            let Some(value) = self.get_add(&mut cur) else {
                return true;
            };
            events.push(Event::SetMem { addr, value });
        } else if matches!(cur.peek(), Some(b) if b.is_ascii_alphabetic()) {
            let mut name = String::new();
            while matches!(cur.peek(), Some(b) if b.is_ascii_alphanumeric()) {
                name.push(cur.bytes[cur.pos].to_ascii_uppercase() as char);
                cur.advance();
            }
            if let Some(reg) = Reg::from_name(&name) {
                if !self.expect_eq(&mut cur) {
                    return true;
                }
                let Some(value) = self.get_add(&mut cur) else {
                    return true;
                };
                events.push(Event::SetReg { reg, value });
            } else if let Some(flag) = Flag::from_name(&name) {
                if !self.expect_eq(&mut cur) {
                    return true;
                }
                cur.skip_space_or_comment();
                let value = match cur.peek() {
                    Some(b'0') => false,
                    Some(b'1') => true,
                    _ => {
                        self.input_error("'0' または '1' が必要です。");
                        return true;
                    }
                };
                cur.advance();
                events.push(Event::SetFlag { flag, value });
            } else {
                self.input_error(format!(
                    "レジスタまたはフラグ名が不正です。（名前の開始部: \"{name}\"）"
                ));
                return true;
            }
        }
        cur.skip_space_or_comment();
        if !cur.at_end() {
            self.input_error(format!("入力の後部が解析できませんでした。（行: {line}）"));
        }
        true
    }

    fn parse_wait(&mut self, cur: &mut Cursor<'_>) -> Option<Event> {
        let Some(target) = cur.get_word() else {
            self.input_error("引数が必要です。");
            return None;
        };
        match target.as_str() {
            "STOP" => Some(Event::WaitStop),
            "SERIAL" => Some(Event::WaitSerial),
            "STATES" | "MS" | "SEC" => {
                cur.skip_space_or_comment();
                if !cur.is_digit() {
                    self.input_error("整数が必要です。");
                    return None;
                }
                let mut digits = String::new();
                while cur.is_digit() {
                    digits.push(cur.bytes[cur.pos] as char);
                    cur.advance();
                }
                let Ok(count) = digits.parse::<u64>() else {
                    self.input_error(format!("整数が大きすぎます。（整数: {digits}）"));
                    return None;
                };
                let states = match target.as_str() {
                    "MS" => count.saturating_mul(STATES_PER_SEC) / 1000,
                    "SEC" => count.saturating_mul(STATES_PER_SEC),
                    _ => count,
                };
                Some(Event::WaitStates { states })
            }
            _ => {
                self.input_error(format!("WAITコマンドの対象が不正です。（対象: {target}）"));
                None
            }
        }
    }

    fn parse_mode(&mut self, cur: &mut Cursor<'_>) -> Option<OutputMode> {
        let Some(word) = cur.get_word() else {
            self.input_error("引数が必要です。");
            return None;
        };
        let mode = OutputMode::from_name(&word);
        if mode.is_none() {
            self.input_error(
                "出力モードが必要です。（使用可能な出力モード: (RAW|HEX|TEC|SDEC|UDEC)）",
            );
        }
        mode
    }

    fn parse_print(&mut self, cur: &mut Cursor<'_>) -> Option<Event> {
        cur.skip_space_or_comment();
        if cur.eat(b'[') {
            let addr = self.get_add(cur)?;
            if !self.expect_rbracket(cur) {
                return None;
            }
            return Some(Event::PrintMem { addr });
        }
        if !matches!(cur.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.input_error("表示対象が不正です。");
            return None;
        }
        let mut name = String::new();
        while matches!(cur.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-') {
            name.push(cur.bytes[cur.pos].to_ascii_uppercase() as char);
            cur.advance();
        }
        if let Some(reg) = Reg::from_name(&name) {
            return Some(Event::PrintReg { reg });
        }
        if let Some(flag) = Flag::from_name(&name) {
            return Some(Event::PrintFlag { flag });
        }
        match name.as_str() {
            "PARALLEL" => Some(Event::PrintParallel),
            "EXT-PARALLEL" => Some(Event::PrintExtParallel),
            "BUZ" => Some(Event::PrintBuzzer),
            "SPK" => Some(Event::PrintSpeaker),
            "RUN" => Some(Event::PrintRun),
            _ => {
                self.input_error(format!(
                    "レジスタまたはフラグ名が不正です。 (名前の開始部: \"{name}\")"
                ));
                None
            }
        }
    }

    fn parse_serial(&mut self, cur: &mut Cursor<'_>) -> Option<Event> {
        let mut bytes = Vec::new();
        loop {
            cur.skip_space_or_comment();
            if cur.eat(b'"') {
                while let Some(b) = cur.peek() {
                    if !is_print(b) || b == b'"' {
                        break;
                    }
                    bytes.push(b);
                    cur.advance();
                }
                if !cur.eat(b'"') {
                    self.input_error("\" が必要です。");
                    return None;
                }
            } else {
                bytes.push(self.get_add(cur)?);
            }
            if !cur.eat(b',') {
                break;
            }
        }
        Some(Event::Serial { bytes })
    }

    fn parse_analog(&mut self, cur: &mut Cursor<'_>) -> Option<Event> {
        let Some(channel_word) = cur.get_word() else {
            self.input_error("ADCチャンネルが必要です。");
            return None;
        };
        let word = channel_word.as_bytes();
        if word.len() != 3 || word[0] != b'C' || word[1] != b'H' || !(b'0'..=b'3').contains(&word[2])
        {
            self.input_error("ADCチャンネルが必要です。");
            return None;
        }
        let channel = word[2] - b'0';
        let volts = self.get_float(cur)?;
        cur.skip_space_or_comment();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = if cur.eat(b'V') {
            (255.0 * volts / 3.3) as u8
        } else if cur.eat(b'm') {
            if !cur.eat(b'V') {
                self.input_error("'V' または \"mV\" が必要です。");
                return None;
            }
            (255.0 * volts / 3300.0) as u8
        } else {
            self.input_error("'V' または \"mV\" が必要です。");
            return None;
        };
        Some(Event::Analog { channel, value })
    }

    fn get_float(&mut self, cur: &mut Cursor<'_>) -> Option<f32> {
        cur.skip_space_or_comment();
        if !cur.is_digit() {
            self.input_error("実数が必要です。");
            return None;
        }
        let mut digits = String::new();
        while cur.is_digit() {
            digits.push(cur.bytes[cur.pos] as char);
            cur.advance();
        }
        if cur.eat(b'.') {
            if !cur.is_digit() {
                self.input_error("'.' の後に小数部がありません。");
                return None;
            }
            digits.push('.');
            while cur.is_digit() {
                digits.push(cur.bytes[cur.pos] as char);
                cur.advance();
            }
        }
        match digits.parse::<f32>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                self.input_error(format!("実数が大きすぎます。 （実数: \"{digits}\"）"));
                None
            }
        }
    }

    fn expect_eq(&mut self, cur: &mut Cursor<'_>) -> bool {
        cur.skip_space_or_comment();
        if cur.eat(b'=') {
            return true;
        }
        self.input_error("'=' が必要です。");
        false
    }

    fn expect_rbracket(&mut self, cur: &mut Cursor<'_>) -> bool {
        cur.skip_space_or_comment();
        if cur.eat(b']') {
            return true;
        }
        self.input_error("']' が必要です。");
        false
    }

    fn get_add(&mut self, cur: &mut Cursor<'_>) -> Option<u8> {
        let mut value = self.get_mul(cur)?;
        loop {
            cur.skip_space_or_comment();
            if cur.eat(b'+') {
                value = value.wrapping_add(self.get_mul(cur)?);
            } else if cur.eat(b'-') {
                value = value.wrapping_sub(self.get_mul(cur)?);
            } else {
                break;
            }
        }
        Some(value)
    }

    fn get_mul(&mut self, cur: &mut Cursor<'_>) -> Option<u8> {
        let mut value = self.get_value(cur)?;
        loop {
            cur.skip_space_or_comment();
            if cur.eat(b'*') {
                value = value.wrapping_mul(self.get_value(cur)?);
            } else if cur.eat(b'/') {
                let divisor = self.get_value(cur)?;
                if divisor == 0 {
                    self.input_error("零除算が検出されました。");
                    return None;
                }
                value /= divisor;
            } else {
                break;
            }
        }
        Some(value)
    }

    fn get_value(&mut self, cur: &mut Cursor<'_>) -> Option<u8> {
        cur.skip_space_or_comment();
        let mut positive = true;
        if cur.eat(b'+') {
            cur.skip_space_or_comment();
        } else if cur.eat(b'-') {
            cur.skip_space_or_comment();
            positive = false;
        }
        let value = if cur.is_label_start() {
            self.get_label(cur)?
        } else if cur.is_digit() {
            self.get_num(cur)?
        } else if cur.eat(b'(') {
            let inner = self.get_add(cur)?;
            cur.skip_space_or_comment();
            if !cur.eat(b')') {
                self.input_error("')' が必要です。");
                return None;
            }
            inner
        } else if cur.eat(b'\'') {
            let Some(b) = cur.peek().filter(|b| is_print(*b)) else {
                self.input_error("文字定数が不正です。");
                return None;
            };
            cur.advance();
            if !cur.eat(b'\'') {
                self.input_error("'\\'' （クォーテーション）が必要です。");
                return None;
            }
            b
        } else {
            self.input_error("値が必要です。");
            return None;
        };
        Some(if positive { value } else { value.wrapping_neg() })
    }

    fn get_label(&mut self, cur: &mut Cursor<'_>) -> Option<u8> {
        let mut label = String::new();
        while cur.is_label_char() {
            label.push(cur.bytes[cur.pos].to_ascii_uppercase() as char);
            cur.advance();
        }
        match self.names.get(&label) {
            Some(value) => Some(*value),
            None => {
                self.errors
                    .push(format!("エラー: ラベルが見つかりません。 (ラベル: \"{label}\")"));
                None
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get_num(&mut self, cur: &mut Cursor<'_>) -> Option<u8> {
        let mut digits = String::new();
        let mut hex = false;
        while let Some(b) = cur.peek() {
            if !b.is_ascii_hexdigit() {
                break;
            }
            if !b.is_ascii_digit() {
                hex = true;
            }
            digits.push(b as char);
            cur.advance();
        }
        if cur.eat(b'H') || cur.eat(b'h') {
            hex = true;
        } else if hex {
            self.input_error("16進数リテラルが不正です。（'H' が必要です。）");
            return None;
        }
        let radix = if hex { 16 } else { 10 };
        match u32::from_str_radix(&digits, radix) {
            Ok(value) if value <= i32::MAX as u32 => Some(value as u8),
            _ => {
                self.input_error(format!("値が大きすぎます。 (値: \"{digits}\")"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_scenario, Event};
    use crate::loader::NameTable;
    use crate::printer::OutputMode;
    use tec7_core::{Flag, Reg};

    fn parse(script: &str) -> Vec<Event> {
        parse_scenario(script, &NameTable::new()).expect("script should parse")
    }

    #[test]
    fn every_script_ends_with_an_implicit_wait_stop() {
        assert_eq!(parse(""), vec![Event::WaitStop]);
        assert_eq!(parse("$RUN\n"), vec![Event::Run, Event::WaitStop]);
    }

    #[test]
    fn end_stops_reading_the_rest() {
        let events = parse("$RUN\n$END\n$STOP\n");
        assert_eq!(events, vec![Event::Run, Event::WaitStop]);
    }

    #[test]
    fn wait_forms_convert_to_states() {
        let events = parse("$WAIT STATES 64\n$WAIT MS 100\n$WAIT SEC 1\n$WAIT SERIAL\n");
        assert_eq!(
            events,
            vec![
                Event::WaitStates { states: 64 },
                Event::WaitStates { states: 245_760 },
                Event::WaitStates { states: 2_457_600 },
                Event::WaitSerial,
                Event::WaitStop,
            ]
        );
    }

    #[test]
    fn serial_accepts_strings_and_byte_expressions() {
        let events = parse("$SERIAL \"HI\",0,41H\n");
        assert_eq!(
            events[0],
            Event::Serial {
                bytes: vec![b'H', b'I', 0, 0x41]
            }
        );
    }

    #[test]
    fn assignments_parse_registers_flags_and_memory() {
        let events = parse("G0 = 10\nC = 1\n[3CH] = 'x'\nSP = 0D0H\n");
        assert_eq!(
            events[..4],
            [
                Event::SetReg {
                    reg: Reg::G0,
                    value: 10
                },
                Event::SetFlag {
                    flag: Flag::C,
                    value: true
                },
                Event::SetMem {
                    addr: 0x3C,
                    value: b'x'
                },
                Event::SetReg {
                    reg: Reg::Sp,
                    value: 0xD0
                },
            ]
        );
    }

    #[test]
    fn print_targets_cover_the_machine_surface() {
        let events = parse("$PRINT G1\n$PRINT Z\n$PRINT [10H]\n$PRINT EXT-PARALLEL\n$PRINT RUN\n");
        assert_eq!(events[0], Event::PrintReg { reg: Reg::G1 });
        assert_eq!(events[1], Event::PrintFlag { flag: Flag::Z });
        assert_eq!(events[2], Event::PrintMem { addr: 0x10 });
        assert_eq!(events[3], Event::PrintExtParallel);
        assert_eq!(events[4], Event::PrintRun);
    }

    #[test]
    fn modes_select_output_encodings() {
        let events = parse("$SERIAL-MODE HEX\n$PRINT-MODE SDEC\n");
        assert_eq!(
            events[0],
            Event::SetSerialMode {
                mode: OutputMode::Hex
            }
        );
        assert_eq!(
            events[1],
            Event::SetPrintMode {
                mode: OutputMode::Sdec
            }
        );
    }

    #[test]
    fn analog_quantises_volts_and_millivolts() {
        let events = parse("$ANALOG CH0 3.3V\n$ANALOG CH2 1600mV\n");
        assert_eq!(
            events[0],
            Event::Analog {
                channel: 0,
                value: 255
            }
        );
        assert_eq!(
            events[1],
            Event::Analog {
                channel: 2,
                value: 123
            }
        );
    }

    #[test]
    fn labels_resolve_through_the_name_table() {
        let mut names = NameTable::new();
        names.insert("COUNT".into(), 0x2A);
        let events = parse_scenario("$PRINT [COUNT]\n", &names).unwrap();
        assert_eq!(events[0], Event::PrintMem { addr: 0x2A });

        let errors = parse_scenario("$PRINT [MISSING]\n", &names).unwrap_err();
        assert!(errors[0].starts_with("エラー: "));
        assert!(errors[0].contains("MISSING"));
    }

    #[test]
    fn expression_sublanguage_wraps_at_eight_bits() {
        let events = parse("$DATA-SW 200+100\n$PARALLEL -1\n");
        assert_eq!(events[0], Event::SetDataSwitch { value: 44 });
        assert_eq!(events[1], Event::WriteParallel { value: 0xFF });
    }

    #[test]
    fn errors_accumulate_across_lines() {
        let errors =
            parse_scenario("$BOGUS\n$WAIT NEVER\nG9 = 1\nC = 2\n", &NameTable::new()).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.starts_with("入力: ")));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let events = parse("; a comment\n\n$RUN ; trailing\n");
        assert_eq!(events, vec![Event::Run, Event::WaitStop]);
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        let errors = parse_scenario("$RUN now\n", &NameTable::new()).unwrap_err();
        assert!(errors[0].contains("入力の後部"));
    }
}
