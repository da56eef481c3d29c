use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};

use brio::ast_printer::AstPrinter;
use brio::diagnostics::Diagnostics;
use brio::parser::Parser;
use brio::runner::Runner;
use brio::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(name = "brio", version, about = "Brio language interpreter", long_about = None)]
pub struct Cli {
    /// Script to execute; starts the REPL when omitted
    script: Option<PathBuf>,

    /// Print the scanned tokens instead of running the script
    #[arg(long)]
    tokens: bool,

    /// Parse the script as a single expression and print its syntax tree
    #[arg(long)]
    ast: bool,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'brio::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("brio::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn main() -> Result<()> {
    // Exit code 64 for command-line misuse, per the sysexits convention.
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            std::process::exit(64);
        }
    };

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.script {
        Some(path) => {
            let buf = read_file(&path)?;

            if args.tokens {
                dump_tokens(&buf);
            } else if args.ast {
                dump_ast(&buf);
            } else {
                run_file(&buf);
            }
        }

        None => run_prompt()?,
    }

    Ok(())
}

/// Execute a script, then exit with 65 on static errors and 70 on a
/// runtime error.
fn run_file(source: &[u8]) {
    let mut runner = Runner::new();
    runner.run(source);

    if runner.had_error() {
        debug!("Static errors; exiting with code 65");
        std::process::exit(65);
    }

    if runner.had_runtime_error() {
        debug!("Runtime error; exiting with code 70");
        std::process::exit(70);
    }
}

/// Interactive prompt.  One interpreter lives for the whole session, so
/// globals persist between lines; the error flags reset per line.
fn run_prompt() -> Result<()> {
    let mut runner = Runner::new();
    let stdin = io::stdin();

    loop {
        print!("brio> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = stdin.read_line(&mut line)?;
        if bytes == 0 {
            // EOF (ctrl-D or piped input ended)
            println!();
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        runner.run(line.as_bytes());
        runner.reset_errors();
    }

    Ok(())
}

/// `--tokens`: print each scanned token, one per line.
fn dump_tokens(source: &[u8]) {
    let mut clean = true;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => println!("{}", token),
            Err(error) => {
                clean = false;
                eprintln!("{}", error);
            }
        }
    }

    if !clean {
        std::process::exit(65);
    }
}

/// `--ast`: parse the source as a single expression and print its prefix
/// form.
fn dump_ast(source: &[u8]) {
    let mut diagnostics = Diagnostics::new();

    let mut tokens = Vec::new();
    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(error) => diagnostics.report(&error),
        }
    }

    let expr = Parser::new(&tokens, &mut diagnostics).parse_expression();

    if diagnostics.had_error() {
        std::process::exit(65);
    }

    if let Some(expr) = expr {
        println!("{}", AstPrinter::print(&expr));
    }
}
