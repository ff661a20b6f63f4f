//! Expression parsing: a validating reader for Pass 1 and an evaluating
//! reader for Pass 2.
//!
//! Grammar, highest precedence first: unary `+`/`-` and parentheses, then
//! `*`/`/`, then `+`/`-`. Values are decimal or hex numerals (hex needs the
//! `H` suffix), `'c'` character literals, and labels. Evaluation runs in
//! 32-bit signed arithmetic with wrapping; the result is narrowed to 8 bits
//! at emission. The two readers accept exactly the same surface syntax so
//! both passes agree on every line.

use crate::cursor::{is_print, Cursor};
use crate::diag::{Diagnostics, ErrorCode, WarningCode};
use crate::symbols::LabelTable;

/// Evaluates one additive expression at the cursor.
pub(crate) fn eval_add(
    cur: &mut Cursor<'_>,
    line: usize,
    labels: &LabelTable,
    diags: &mut Diagnostics,
) -> Option<i32> {
    ExprEval {
        cur,
        line,
        labels,
        diags,
    }
    .get_add()
}

/// Validates one additive expression at the cursor without evaluating.
pub(crate) fn check_add(cur: &mut Cursor<'_>, line: usize, diags: &mut Diagnostics) -> bool {
    ExprCheck { cur, line, diags }.parse_add()
}

/// Validates a `DC` expression list, accumulating its byte size.
pub(crate) fn check_expr_list(
    cur: &mut Cursor<'_>,
    line: usize,
    diags: &mut Diagnostics,
    count: &mut u8,
) -> bool {
    ExprCheck { cur, line, diags }.parse_expr_list(count)
}

const fn hex_digit_value(byte: u8) -> u32 {
    if byte.is_ascii_digit() {
        (byte - b'0') as u32
    } else {
        (byte - b'A' + 10) as u32
    }
}

struct ExprEval<'a, 'b> {
    cur: &'a mut Cursor<'b>,
    line: usize,
    labels: &'a LabelTable,
    diags: &'a mut Diagnostics,
}

impl ExprEval<'_, '_> {
    fn get_add(&mut self) -> Option<i32> {
        let mut value = self.get_mul()?;
        loop {
            self.cur.skip_space();
            if self.cur.eat(b'+') {
                value = value.wrapping_add(self.get_mul()?);
            } else if self.cur.eat(b'-') {
                value = value.wrapping_sub(self.get_mul()?);
            } else {
                break;
            }
        }
        Some(value)
    }

    fn get_mul(&mut self) -> Option<i32> {
        let mut value = self.get_val()?;
        loop {
            self.cur.skip_space();
            let op_beg = self.cur.pos();
            if self.cur.eat(b'*') {
                value = value.wrapping_mul(self.get_val()?);
            } else if self.cur.eat(b'/') {
                let divisor = self.get_val()?;
                if divisor == 0 {
                    self.diags.error(
                        ErrorCode::ZeroDivision,
                        self.line,
                        op_beg,
                        Some(self.cur.pos() - op_beg),
                        None,
                    );
                    return None;
                }
                value = value.wrapping_div(divisor);
            } else {
                break;
            }
        }
        Some(value)
    }

    fn get_val(&mut self) -> Option<i32> {
        self.cur.skip_space();
        let mut positive = true;
        if self.cur.eat(b'+') {
            self.cur.skip_space();
        } else if self.cur.eat(b'-') {
            self.cur.skip_space();
            positive = false;
        }
        let beg = self.cur.pos();
        let mut value;
        if self.cur.eat(b'(') {
            value = self.get_add()?;
            if !self.cur.eat(b')') {
                self.diags.error(
                    ErrorCode::RParenExpected,
                    self.line,
                    beg,
                    Some(self.cur.pos() - beg),
                    None,
                );
                return None;
            }
        } else if self.cur.eat(b'\'') {
            match self.cur.peek() {
                Some(b) if is_print(b) && b != b'\'' => {
                    value = i32::from(b);
                    self.cur.advance();
                }
                _ => {
                    self.diags.error(
                        ErrorCode::InvalidCharLiteral,
                        self.line,
                        beg,
                        Some(self.cur.pos() - beg),
                        None,
                    );
                    return None;
                }
            }
            if !self.cur.eat(b'\'') {
                self.diags.error(
                    ErrorCode::QuoteExpected,
                    self.line,
                    beg,
                    Some(self.cur.pos() - beg),
                    None,
                );
                return None;
            }
        } else if self.cur.is_digit() {
            value = self.get_num()?;
        } else if self.cur.is_name_start() {
            let name = self.cur.get_name();
            match self.labels.get(&name) {
                Some(label) => value = i32::from(label.value),
                None => {
                    self.diags.error(
                        ErrorCode::UndefinedLabel,
                        self.line,
                        beg,
                        Some(self.cur.pos() - beg),
                        Some(format!("ラベル: \"{name}\"")),
                    );
                    return None;
                }
            }
        } else {
            self.diags
                .error(ErrorCode::ExpressionExpected, self.line, beg, None, None);
            return None;
        }
        if !positive {
            value = value.wrapping_neg();
        }
        Some(value)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn get_num(&mut self) -> Option<i32> {
        let beg = self.cur.pos();
        let mut is_hex = false;
        let mut digits = String::new();
        while let Some(b) = self.cur.peek() {
            if !b.is_ascii_hexdigit() {
                break;
            }
            if !b.is_ascii_digit() {
                is_hex = true;
            }
            digits.push(b.to_ascii_uppercase() as char);
            self.cur.advance();
        }
        if self.cur.eat(b'H') || self.cur.eat(b'h') {
            is_hex = true;
        } else if is_hex {
            self.diags.error(
                ErrorCode::HExpected,
                self.line,
                beg,
                Some(self.cur.pos() - beg),
                None,
            );
            return None;
        }
        // Unsigned accumulation with manual overflow detection; the wrapped
        // value is still emitted after the warning.
        let mut value: u32 = 0;
        let mut overflow = false;
        for byte in digits.bytes() {
            let digit = hex_digit_value(byte);
            if is_hex {
                if (i32::MAX as u32 - digit) >> 4 < value {
                    overflow = true;
                }
                value = (value << 4).wrapping_add(digit);
            } else {
                if (i32::MAX as u32 - digit) / 10 < value {
                    overflow = true;
                }
                value = value.wrapping_mul(10).wrapping_add(digit);
            }
        }
        if overflow {
            let suffix = if is_hex { "H" } else { "" };
            self.diags.warning(
                WarningCode::NumberTooBig,
                self.line,
                beg,
                Some(self.cur.pos() - beg),
                Some(format!("数値: {digits}{suffix}")),
            );
        }
        Some(value as i32)
    }
}

struct ExprCheck<'a, 'b> {
    cur: &'a mut Cursor<'b>,
    line: usize,
    diags: &'a mut Diagnostics,
}

impl ExprCheck<'_, '_> {
    fn parse_add(&mut self) -> bool {
        if !self.parse_mul() {
            return false;
        }
        loop {
            self.cur.skip_space();
            if self.cur.eat(b'+') || self.cur.eat(b'-') {
                if !self.parse_mul() {
                    return false;
                }
            } else {
                break;
            }
        }
        true
    }

    fn parse_mul(&mut self) -> bool {
        if !self.parse_val() {
            return false;
        }
        loop {
            self.cur.skip_space();
            if self.cur.eat(b'*') || self.cur.eat(b'/') {
                if !self.parse_val() {
                    return false;
                }
            } else {
                break;
            }
        }
        true
    }

    fn parse_val(&mut self) -> bool {
        self.cur.skip_space();
        if self.cur.eat(b'+') || self.cur.eat(b'-') {
            self.cur.skip_space();
        }
        let beg = self.cur.pos();
        if self.cur.eat(b'(') {
            if !self.parse_add() {
                return false;
            }
            if !self.cur.eat(b')') {
                self.diags.error(
                    ErrorCode::RParenExpected,
                    self.line,
                    beg,
                    Some(self.cur.pos() - beg),
                    None,
                );
                return false;
            }
        } else if self.cur.eat(b'\'') {
            match self.cur.peek() {
                Some(b) if is_print(b) && b != b'\'' => self.cur.advance(),
                _ => {
                    self.diags.error(
                        ErrorCode::InvalidCharLiteral,
                        self.line,
                        beg,
                        Some(self.cur.pos() - beg),
                        None,
                    );
                    return false;
                }
            }
            if !self.cur.eat(b'\'') {
                self.diags.error(
                    ErrorCode::QuoteExpected,
                    self.line,
                    beg,
                    Some(self.cur.pos() - beg),
                    None,
                );
                return false;
            }
        } else if self.cur.is_digit() {
            if !self.parse_num() {
                return false;
            }
        } else if self.cur.is_name_start() {
            self.cur.skip_name();
        } else {
            self.diags
                .error(ErrorCode::ExpressionExpected, self.line, beg, None, None);
            return false;
        }
        true
    }

    fn parse_num(&mut self) -> bool {
        let beg = self.cur.pos();
        let mut is_hex = false;
        while let Some(b) = self.cur.peek() {
            if !b.is_ascii_hexdigit() {
                break;
            }
            if !b.is_ascii_digit() {
                is_hex = true;
            }
            self.cur.advance();
        }
        if self.cur.eat(b'H') || self.cur.eat(b'h') {
            return true;
        }
        if is_hex {
            self.diags.error(
                ErrorCode::HExpected,
                self.line,
                beg,
                Some(self.cur.pos() - beg),
                None,
            );
            return false;
        }
        true
    }

    fn parse_expr(&mut self, count: &mut u8) -> bool {
        self.cur.skip_space();
        let beg = self.cur.pos();
        if self.cur.eat(b'"') {
            while let Some(b) = self.cur.peek() {
                if !is_print(b) || b == b'"' {
                    break;
                }
                *count = count.wrapping_add(1);
                self.cur.advance();
            }
            if !self.cur.eat(b'"') {
                self.diags.error(
                    ErrorCode::DoubleQuoteExpected,
                    self.line,
                    beg,
                    Some(self.cur.pos() - beg),
                    None,
                );
                return false;
            }
        } else {
            if !self.parse_add() {
                return false;
            }
            *count = count.wrapping_add(1);
        }
        true
    }

    fn parse_expr_list(&mut self, count: &mut u8) -> bool {
        if !self.parse_expr(count) {
            return false;
        }
        loop {
            self.cur.skip_space();
            if self.cur.eat(b',') {
                if !self.parse_expr(count) {
                    return false;
                }
            } else {
                break;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{check_add, check_expr_list, eval_add};
    use crate::cursor::Cursor;
    use crate::diag::Diagnostics;
    use crate::symbols::{Label, LabelTable};

    fn eval(src: &str) -> (Option<i32>, Diagnostics) {
        let mut labels = LabelTable::new();
        labels.insert("LOOP".into(), Label { value: 0x10, line: 1 });
        let mut diags = Diagnostics::new();
        let mut cur = Cursor::new(src);
        let value = eval_add(&mut cur, 1, &labels, &mut diags);
        (value, diags)
    }

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval("1+2*3").0, Some(7));
        assert_eq!(eval("(1+2)*3").0, Some(9));
        assert_eq!(eval("10/3").0, Some(3));
        assert_eq!(eval("2 + 3 - 1").0, Some(4));
    }

    #[test]
    fn unary_sign_applies_to_one_value() {
        assert_eq!(eval("-3").0, Some(-3));
        assert_eq!(eval("-(2+3)").0, Some(-5));
        assert_eq!(eval("+7").0, Some(7));
    }

    #[test]
    fn numeric_bases_and_character_literals() {
        assert_eq!(eval("42").0, Some(42));
        assert_eq!(eval("1FH").0, Some(0x1F));
        assert_eq!(eval("0ffh").0, Some(0xFF));
        assert_eq!(eval("'A'").0, Some(65));
    }

    #[test]
    fn labels_resolve_through_the_table() {
        assert_eq!(eval("LOOP+1").0, Some(0x11));
        assert_eq!(eval("loop").0, Some(0x10));
        let (value, diags) = eval("nowhere");
        assert_eq!(value, None);
        assert!(diags.has_errors());
    }

    #[test]
    fn hex_digits_without_suffix_are_an_error() {
        let (value, diags) = eval("1F");
        assert_eq!(value, None);
        assert!(diags.has_errors());
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let (value, diags) = eval("4/0");
        assert_eq!(value, None);
        assert!(diags.has_errors());
    }

    #[test]
    fn empty_character_literal_is_rejected() {
        assert_eq!(eval("''").0, None);
    }

    #[test]
    fn big_literals_warn_but_keep_the_wrapped_value() {
        let (value, diags) = eval("4294967295");
        assert!(value.is_some());
        assert!(!diags.has_errors());
        assert!(!diags.is_empty());
    }

    #[test]
    fn validator_accepts_what_the_evaluator_accepts() {
        for src in ["1+2*3", "(1+2)*3", "-FWD+2", "'A'", "0FFH", "1 + 2 + 3"] {
            let mut diags = Diagnostics::new();
            let mut cur = Cursor::new(src);
            assert!(check_add(&mut cur, 1, &mut diags), "rejected: {src}");
            assert!(!diags.has_errors());
        }
    }

    #[test]
    fn validator_rejects_trailing_operators() {
        let mut diags = Diagnostics::new();
        let mut cur = Cursor::new("1+");
        assert!(!check_add(&mut cur, 1, &mut diags));
        assert!(diags.has_errors());
    }

    #[test]
    fn expr_list_counts_strings_and_values() {
        let mut diags = Diagnostics::new();
        let mut cur = Cursor::new("\"AB\", 1, 'x', 2+3");
        let mut count = 0;
        assert!(check_expr_list(&mut cur, 1, &mut diags, &mut count));
        assert_eq!(count, 5);
    }
}
