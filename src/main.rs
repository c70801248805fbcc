//! cfmlc CLI
//!
//! Command-line interface for the CFML front-end compiler.

use std::env;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use cfmlc::config::CONFIG_ENV;
use cfmlc::{CfmlError, Compiler, CompilerOptions, Diagnostic, SourceUnit, VERSION};

/// Environment variable holding the log filter
const LOG_ENV: &str = "CFMLC_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Dialect,
    Ast,
    Target,
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();

    let mut output = Output::Target;
    let mut show_help = false;
    let mut config: Option<String> = env::var(CONFIG_ENV).ok();
    let mut filename: Option<&String> = None;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--dialect" | "-d" => output = Output::Dialect,
            "--ast" | "-a" => output = Output::Ast,
            "--help" | "-h" => show_help = true,
            "--config" | "-c" => match rest.next() {
                Some(path) => config = Some(path.clone()),
                None => {
                    eprintln!("Missing value for {}", arg);
                    print_usage();
                    process::exit(1);
                }
            },
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {}", arg);
                print_usage();
                process::exit(1);
            }
            _ => filename = Some(arg),
        }
    }

    if show_help {
        print_help();
        return;
    }

    let Some(file) = filename else {
        eprintln!("Error: No input file specified");
        print_usage();
        process::exit(1);
    };

    if let Err(e) = run_file(file, config.as_deref(), output) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    eprintln!("Usage: cfmlc [OPTIONS] <file>");
    eprintln!("       cfmlc --help");
}

fn print_help() {
    println!("cfmlc v{} - CFML front-end compiler", VERSION);
    println!();
    println!("USAGE:");
    println!("    cfmlc [OPTIONS] <file>");
    println!();
    println!("OPTIONS:");
    println!("    -d, --dialect        Print the detected dialect only");
    println!("    -a, --ast            Print the unified AST as JSON");
    println!("    -c, --config <file>  Load compiler options from a JSON file");
    println!("    -h, --help           Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    {:<20} Compiler options file (overridden by --config)", CONFIG_ENV);
    println!("    {:<20} Log filter, e.g. 'debug' or 'cfmlc=info' (default: warn)", LOG_ENV);
    println!();
    println!("EXAMPLES:");
    println!("    cfmlc index.cfm             Print the generated target AST");
    println!("    cfmlc --ast Service.cfc     Print the unified AST");
    println!("    cfmlc --dialect page.cfml   Print 'tag-based' or 'script-based'");
}

/// Compile one file and print the requested stage
fn run_file(filename: &str, config: Option<&str>, output: Output) -> Result<(), String> {
    let options = match config {
        Some(path) => {
            info!(path, "loading compiler options");
            CompilerOptions::from_file(path).map_err(|e| render(e, None))?
        }
        None => CompilerOptions::default(),
    };

    let unit = SourceUnit::from_file(filename).map_err(|e| render(e, None))?;
    let mut compiler = Compiler::new(options);

    let json = match output {
        Output::Dialect => {
            let dialect = compiler
                .classify(&unit)
                .map_err(|e| render(e, Some(unit.text())))?;
            println!("{}", dialect);
            return Ok(());
        }
        Output::Ast => {
            let script = compiler
                .parse(&unit)
                .map_err(|e| render(e, Some(unit.text())))?;
            serde_json::to_string_pretty(&script)
        }
        Output::Target => {
            let target = compiler
                .compile(&unit)
                .map_err(|e| render(e, Some(unit.text())))?;
            serde_json::to_string_pretty(&target)
        }
    };

    let json = json.map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn render(error: CfmlError, source: Option<&str>) -> String {
    let diagnostic = match source {
        Some(source) => Diagnostic::with_source(error, source),
        None => Diagnostic::new(error),
    };
    diagnostic.format().trim_end().to_string()
}
