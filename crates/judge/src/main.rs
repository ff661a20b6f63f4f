//! CLI entry point for the `tec` judge binary.

use std::env;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use tec7_judge::{parse_scenario, read_binary, read_name_table, Driver, NameTable};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let code = run(&args);
    // Keep whatever already reached stdout even when aborting.
    let _ = io::stdout().flush();
    code
}

fn run(args: &[String]) -> ExitCode {
    if args.len() < 2 || args.len() > 3 {
        let command = args.first().map_or("tec", String::as_str);
        eprintln!("使用方法: {command} <program>.bin [<program>.nt]");
        return ExitCode::FAILURE;
    }

    let binary = match read_binary(&args[1]) {
        Ok(binary) => binary,
        Err(error) => {
            eprintln!("機械語: {error}");
            return ExitCode::FAILURE;
        }
    };

    let names = if args.len() == 3 {
        match read_name_table(&args[2]) {
            Ok(table) => table,
            Err(errors) => {
                for error in errors {
                    eprintln!("名前表: {error}");
                }
                return ExitCode::FAILURE;
            }
        }
    } else {
        NameTable::new()
    };

    let mut script = String::new();
    if io::stdin().read_to_string(&mut script).is_err() {
        eprintln!("入力: 入力を読み取れませんでした。");
        return ExitCode::FAILURE;
    }
    let events = match parse_scenario(&script, &names) {
        Ok(events) => events,
        Err(errors) => {
            for error in errors {
                eprintln!("{error}");
            }
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut driver = Driver::new(&binary, stdout.lock());
    match driver.run(&events) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("エラー: {error}");
            ExitCode::FAILURE
        }
    }
}
