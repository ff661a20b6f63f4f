//! The two-pass pipeline.
//!
//! Pass 1 assigns every label an address; if it reports no error, Pass 2
//! re-parses the source against the complete table and emits the image.
//! Diagnostics from both passes accumulate in source order.

use crate::diag::Diagnostics;
use crate::symbols::LabelTable;
use crate::{pass1, pass2};

/// The emitted machine-code image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    /// First emitted address.
    pub start: u8,
    /// Emitted byte count, `final address - start` modulo 256.
    pub size: u8,
    /// The full 256-byte address-space image.
    pub bytes: [u8; 256],
}

impl ProgramImage {
    /// The emitted code window: `size` bytes from `start`, wrapping.
    #[must_use]
    pub fn code(&self) -> Vec<u8> {
        (0..usize::from(self.size))
            .map(|offset| self.bytes[(usize::from(self.start) + offset) % 256])
            .collect()
    }

    /// The binary-file artifact: `[start, size, code...]`.
    #[must_use]
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.start, self.size];
        bytes.extend(self.code());
        bytes
    }
}

/// A successful assembly: the image plus the label table.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Emitted machine code.
    pub image: ProgramImage,
    /// Labels for the name-table artifact.
    pub labels: LabelTable,
}

/// Everything one `assemble` call produced.
#[derive(Debug)]
pub struct AssembleOutput {
    /// The assembly, absent when any error was reported.
    pub assembly: Option<Assembly>,
    /// Accumulated errors and warnings.
    pub diagnostics: Diagnostics,
    lines: Vec<String>,
}

impl AssembleOutput {
    /// Renders the diagnostics against the source that produced them.
    #[must_use]
    pub fn render_diagnostics(&self) -> String {
        self.diagnostics.render(&self.lines)
    }
}

/// Assembles a complete source text.
#[must_use]
pub fn assemble(source: &str) -> AssembleOutput {
    let lines: Vec<String> = source.lines().map(str::to_owned).collect();
    let mut diagnostics = Diagnostics::new();

    let labels = pass1::run(&lines, &mut diagnostics);
    if diagnostics.has_errors() {
        return AssembleOutput {
            assembly: None,
            diagnostics,
            lines,
        };
    }

    let image = pass2::run(&lines, &labels, &mut diagnostics);
    let assembly = if diagnostics.has_errors() {
        None
    } else {
        Some(Assembly { image, labels })
    };
    AssembleOutput {
        assembly,
        diagnostics,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::assemble;

    fn bytes_of(source: &str) -> Vec<u8> {
        let output = assemble(source);
        let rendered = output.render_diagnostics();
        output
            .assembly
            .unwrap_or_else(|| panic!("assembly failed:\n{rendered}"))
            .image
            .code()
    }

    #[test]
    fn carry_demo_program_assembles_to_the_expected_bytes() {
        let code = bytes_of("   LD  G0,#200\n   ADD G0,#100\n   HALT\n");
        assert_eq!(code, vec![0x13, 200, 0x33, 100, 0xFF]);
    }

    #[rstest]
    #[case::implied("   NO\n", vec![0x00])]
    #[case::halt("   HALT\n", vec![0xFF])]
    #[case::shift("   SHRA G2\n", vec![0x9A])]
    #[case::push_sp("   PUSH SP\n", vec![0xDC])]
    #[case::load_direct("   LD G0,12H\n", vec![0x10, 0x12])]
    #[case::load_indexed("   LD G1,10H,G2\n", vec![0x16, 0x10])]
    #[case::store_indexed("   ST G0,20H,G1\n", vec![0x21, 0x20])]
    #[case::io("   IN G2,3\n   OUT G2,2\n", vec![0xC8, 0x03, 0xCB, 0x02])]
    #[case::jump("   JMP 10H\n", vec![0xA0, 0x10])]
    #[case::jump_indexed("   JNC 10H,G2\n", vec![0xBA, 0x10])]
    #[case::call("   CALL 30H\n", vec![0xB0, 0x30])]
    fn encoding_classes_produce_the_documented_bytes(
        #[case] source: &str,
        #[case] expected: Vec<u8>,
    ) {
        assert_eq!(bytes_of(source), expected);
    }

    #[test]
    fn labels_resolve_across_both_passes() {
        let code = bytes_of("      JMP FIN\nVAL   DC 7\nFIN   HALT\n");
        assert_eq!(code, vec![0xA0, 0x03, 7, 0xFF]);
    }

    #[test]
    fn org_sets_the_start_address_before_any_code() {
        let output = assemble("      ORG 20H\n      HALT\n");
        let assembly = output.assembly.unwrap();
        assert_eq!(assembly.image.start, 0x20);
        assert_eq!(assembly.image.size, 1);
        assert_eq!(assembly.image.code(), vec![0xFF]);
    }

    #[test]
    fn org_after_code_pads_with_zeros() {
        let code = bytes_of("      NO\n      ORG 4\n      HALT\n");
        assert_eq!(code, vec![0x00, 0, 0, 0, 0xFF]);
    }

    #[test]
    fn ds_and_dc_emit_fill_and_data() {
        let code = bytes_of("      DS 2\n      DC \"AB\", 1+2, 'x'\n");
        assert_eq!(code, vec![0, 0, b'A', b'B', 3, b'x']);
    }

    #[test]
    fn equ_constants_feed_operands() {
        let code = bytes_of("TEN   EQU 10\n      LD G0,#TEN\n      HALT\n");
        assert_eq!(code, vec![0x13, 10, 0xFF]);
    }

    #[test]
    fn file_bytes_carry_start_and_size_header() {
        let output = assemble("      ORG 10H\n      NO\n      HALT\n");
        let image = output.assembly.unwrap().image;
        assert_eq!(image.to_file_bytes(), vec![0x10, 2, 0x00, 0xFF]);
    }

    #[test]
    fn store_immediate_is_a_hard_error() {
        let output = assemble("      ST G0,#10\n");
        assert!(output.assembly.is_none());
        assert!(output.render_diagnostics().contains("即値"));
    }

    #[test]
    fn jump_immediate_is_a_hard_error() {
        let output = assemble("      JMP #10\n");
        assert!(output.assembly.is_none());
    }

    #[test]
    fn rom_store_and_io_range_only_warn() {
        let output = assemble("      ST G0,0F0H\n      IN G0,10H\n");
        assert!(output.assembly.is_some());
        let rendered = output.render_diagnostics();
        assert!(rendered.contains("ROM領域"));
        assert!(rendered.contains("IOアドレス"));
    }

    #[test]
    fn image_reaching_rom_warns_binary_too_large() {
        let output = assemble("      ORG 0DFH\n      DC 1, 2\n");
        assert!(output.assembly.is_some());
        assert!(output
            .render_diagnostics()
            .contains("バイナリサイズが大きすぎます。"));
    }

    #[test]
    fn dc_wrapping_past_the_address_space_still_warns() {
        let mut source = String::from("      DC 1");
        for _ in 0..256 {
            source.push_str(", 1");
        }
        source.push('\n');
        let output = assemble(&source);
        assert!(output
            .render_diagnostics()
            .contains("バイナリサイズが大きすぎます。"));
    }

    #[test]
    fn trailing_operand_text_is_an_error() {
        let output = assemble("      NO extra\n");
        assert!(output.assembly.is_none());
        assert!(output.render_diagnostics().contains("オペランドが不正"));
    }

    #[test]
    fn errors_stop_before_pass_2() {
        // The duplicate label is a Pass 1 error; the Pass 2-only ST
        // immediate error must not be reported.
        let output = assemble("A     NO\nA     NO\n      ST G0,#1\n");
        assert!(output.assembly.is_none());
        let rendered = output.render_diagnostics();
        assert!(rendered.contains("重複"));
        assert!(!rendered.contains("即値"));
    }

    #[test]
    fn empty_source_assembles_to_an_empty_image() {
        let output = assemble("");
        let image = output.assembly.unwrap().image;
        assert_eq!(image.size, 0);
        assert_eq!(image.to_file_bytes(), vec![0, 0]);
    }
}
