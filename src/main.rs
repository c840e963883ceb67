// ABOUTME: Thin CLI over the Pyrl VM: run a script file, an inline command, or a REPL

use clap::Parser;
use pyrl::config::{VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use pyrl::vm::{self, create_vm, ExecutionResult};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::process::ExitCode;

/// Pyrl: a hybrid indentation/sigil scripting language
#[derive(Parser, Debug)]
#[command(name = "pyrl")]
#[command(version = VERSION)]
#[command(about = "Runs Pyrl scripts, or starts an interactive REPL")]
struct CliArgs {
    /// Script file to execute (omit to start the REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Execute the given source directly instead of reading a file
    #[arg(short = 'c', long = "command", value_name = "SOURCE")]
    command: Option<String>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let mut vm = create_vm();

    if let Some(source) = args.command {
        return run_and_report(&mut vm, &source);
    }

    if let Some(path) = args.script {
        let source = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Cannot read script file {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
        return run_and_report(&mut vm, &source);
    }

    run_repl(&mut vm)
}

fn run_and_report(vm: &mut vm::Vm, source: &str) -> ExitCode {
    let result = vm.execute(source);
    print!("{}", result.stdout);
    if result.ok {
        ExitCode::SUCCESS
    } else {
        if let Some(err) = result.error {
            eprintln!("{}: {} at line {}, column {}", err.kind, err.message, err.line, err.col);
        }
        ExitCode::FAILURE
    }
}

fn run_repl(vm: &mut vm::Vm) -> ExitCode {
    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("Type an expression or statement. Ctrl-D to exit.");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to initialize REPL: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let history_file = ".pyrl_history";
    let _ = rl.load_history(history_file);

    loop {
        match rl.readline("pyrl> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                let result: ExecutionResult = vm.execute(&line);
                print!("{}", result.stdout);
                match (result.ok, result.value) {
                    (true, Some(v)) if v != "None" => println!("=> {}", v),
                    (true, _) => {}
                    (false, _) => {
                        if let Some(err) = result.error {
                            eprintln!("{}: {} at line {}, column {}", err.kind, err.message, err.line, err.col);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    ExitCode::SUCCESS
}
