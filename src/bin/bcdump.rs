//! Bytecode dump binary.
//!
//! Reads a TAST fixture from a file (or stdin), generates bytecode for it
//! and prints the program.
//!
//! Usage: `bcdump [FILE] [--stats] [--stack-size N] [--zero-init]`

use bumpalo::Bump;
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use c2bc::bytecode::{BytecodeGenerator, GeneratorConfig};
use c2bc::core::CompilationSession;
use c2bc::test_ast;

#[derive(Parser, Debug)]
#[command(name = "bcdump")]
#[command(about = "Generate bytecode for a TAST file and print it")]
struct Args {
    /// Input file; stdin when omitted
    input: Option<PathBuf>,

    /// Print session statistics after the program
    #[arg(long)]
    stats: bool,

    /// Stack segment size in bytes
    #[arg(long = "stack-size")]
    stack_size: Option<u64>,

    /// Emit explicit zeroing for declarations without an initializer
    #[arg(long = "zero-init")]
    zero_init: bool,
}

fn read_input(input: Option<&PathBuf>) -> io::Result<String> {
    match input {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let text = match read_input(args.input.as_ref()) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read input: {}", e);
            process::exit(1);
        }
    };

    let filename = args.input.as_ref().map(|path| path.display().to_string());
    let ast = match test_ast::parse_file(&text, filename.as_deref()) {
        Ok(ast) => ast,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut config = GeneratorConfig::default().with_explicit_zero_init(args.zero_init);
    if let Some(stack_size) = args.stack_size {
        config = config.with_stack_size(stack_size);
    }

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let generator = BytecodeGenerator::with_config(&session, config);

    match generator.compile_program(&ast) {
        Ok(program) => {
            print!("{}", program);
            log::info!(
                "{} instructions, {} byte static segment",
                program.instruction_count(),
                program.memory().bss_size()
            );
        }
        Err(diagnostics) => {
            for error in diagnostics.errors() {
                eprintln!("error: {}", error);
            }
            eprintln!("{}", diagnostics);
            process::exit(1);
        }
    }

    if args.stats {
        print!("{}", session.stats());
    }
}
