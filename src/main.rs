use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser as ClapParser;
use clap::Subcommand;

use lark::ast_printer::AstPrinter;
use lark::error::LarkError;
use lark::interpreter::Interpreter;
use lark::parser::Parser;
use lark::resolver::Resolver;
use lark::scanner::Scanner;
use lark::stmt::Stmt;
use lark::token::Token;

// sysexits: static errors get EX_DATAERR, runtime errors EX_SOFTWARE.
const EXIT_STATIC_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes the provided input from a given valid filepath
    Tokenize { filename: Option<PathBuf> },

    /// Parses the provided input and prints each statement tree
    Parse { filename: Option<PathBuf> },

    /// Resolves and interprets the provided input
    Run { filename: Option<PathBuf> },
}

fn main() -> anyhow::Result<()> {
    let args: Cli = Cli::parse();

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => {
                let buf: Vec<u8> = read_source(&filename)?;

                let scanner: Scanner = Scanner::new(&buf);
                let mut tokenized = true;

                for token in scanner {
                    match token {
                        Ok(token) => println!("{}", token),

                        Err(e) => {
                            tokenized = false;
                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    std::process::exit(EXIT_STATIC_ERROR);
                }
            }

            None => no_input(),
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                let buf: Vec<u8> = read_source(&filename)?;

                let statements: Vec<Stmt> = front_end(&buf);

                for statement in &statements {
                    println!("{}", AstPrinter::print_stmt(statement));
                }
            }

            None => no_input(),
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                let buf: Vec<u8> = read_source(&filename)?;

                let statements: Vec<Stmt> = front_end(&buf);

                let mut stdout = std::io::stdout();
                let mut interpreter: Interpreter = Interpreter::new(&mut stdout);

                let resolve_errors: Vec<LarkError> =
                    Resolver::new(&mut interpreter).resolve(&statements);

                if !resolve_errors.is_empty() {
                    for e in &resolve_errors {
                        eprintln!("{}", e);
                    }
                    std::process::exit(EXIT_STATIC_ERROR);
                }

                if let Err(e) = interpreter.interpret(&statements) {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_RUNTIME_ERROR);
                }

                stdout.flush()?;
            }

            None => no_input(),
        },
    }

    Ok(())
}

/// Scan and parse, exiting with a static-error code if either stage
/// reported diagnostics.
fn front_end(buf: &[u8]) -> Vec<Stmt> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut had_error = false;

    for token in Scanner::new(buf) {
        match token {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    if had_error {
        std::process::exit(EXIT_STATIC_ERROR);
    }

    let (statements, errors) = Parser::new(tokens).parse();

    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{}", e);
        }
        std::process::exit(EXIT_STATIC_ERROR);
    }

    statements
}

fn read_source(filename: &PathBuf) -> anyhow::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(filename)?);
    reader.read_to_end(&mut buf)?;

    Ok(buf)
}

fn no_input() -> ! {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}
