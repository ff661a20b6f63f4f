//! CLI entry point for the `tasm` assembler binary.

use std::env;
use std::fs;
use std::process::ExitCode;

use tec7_asm::{assemble, format_name_table};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if run(&args) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(args: &[String]) -> bool {
    if args.len() != 2 {
        let command = args.first().map_or("tasm", String::as_str);
        eprintln!("使用方法: {command} <program>.t7");
        return false;
    }
    let input = &args[1];
    let Some(stem) = input.strip_suffix(".t7") else {
        eprintln!("拡張子は、\"t7\" である必要があります。");
        return false;
    };
    let Ok(source) = fs::read_to_string(input) else {
        eprintln!("ファイルが開けませんでした。(パス: \"{input}\")");
        return false;
    };

    let output = assemble(&source);
    let rendered = output.render_diagnostics();
    if !rendered.is_empty() {
        eprint!("{rendered}");
    }
    let Some(assembly) = output.assembly else {
        return false;
    };

    let binary_path = format!("{stem}.bin");
    if fs::write(&binary_path, assembly.image.to_file_bytes()).is_err() {
        eprintln!("ファイルが開けませんでした。 (パス: \"{binary_path}\")");
        return false;
    }
    let name_table_path = format!("{stem}.nt");
    if fs::write(&name_table_path, format_name_table(&assembly.labels)).is_err() {
        eprintln!("ファイルが開けませんでした。 (パス: \"{name_table_path}\")");
        return false;
    }
    true
}
