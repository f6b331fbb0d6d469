use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use nemc::config::Config;
use nemc::diagnostics::render_all;
use nemc::DiagnosticCollector;

#[derive(Parser)]
#[command(name = "nemc", version, about = "Front end for the NEM hardware-mapping language")]
struct Cli {
    /// Config file to use instead of nem.toml next to the source
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Plain diagnostics without ANSI colours
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a .nem file
    Lex {
        /// Source file path
        file: PathBuf,
    },
    /// Print the AST of a .nem file
    Parse {
        /// Source file path
        file: PathBuf,
        /// Emit JSON instead of the debug tree
        #[arg(long)]
        json: bool,
    },
    /// Report diagnostics and evaluated constants
    Check {
        /// Source file path
        file: PathBuf,
    },
    /// Print a .nem file in canonical form
    Fmt {
        /// Source file path
        file: PathBuf,
        /// Exit with status 1 if the file is not already formatted
        #[arg(long)]
        check: bool,
    },
    /// Evaluate one constant expression
    Eval {
        /// Expression, e.g. "TILE * 4"
        #[arg(allow_hyphen_values = true)]
        expr: String,
        /// Define a constant (repeatable)
        #[arg(short = 'D', value_name = "NAME=VALUE", value_parser = parse_define)]
        define: Vec<(String, i64)>,
    },
}

fn parse_define(s: &str) -> Result<(String, i64), String> {
    let (name, value) = s.split_once('=').ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let value = value.trim().parse().map_err(|e| format!("invalid value for '{name}': {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(1);
}

fn read_source(file: &Path) -> String {
    std::fs::read_to_string(file).unwrap_or_else(|e| fail(format!("could not read {}: {e}", file.display())))
}

fn load_config(explicit: Option<&Path>, source: Option<&Path>) -> Config {
    Config::discover(explicit, source).unwrap_or_else(|e| fail(e))
}

/// Render every diagnostic to stderr.
fn report(source: &str, filename: &str, diag: &DiagnosticCollector, color: bool) {
    if !diag.is_empty() {
        eprint!("{}", render_all(source, filename, &diag.get_all(), color));
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();

    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Lex { file } => {
            let source = read_source(&file);
            let config = load_config(explicit, Some(&file));
            let filename = file.display().to_string();
            let mut diag = DiagnosticCollector::new();
            for tok in nemc::tokenize(&source, &filename, &mut diag) {
                println!(
                    "{}:{} {} '{}'",
                    tok.location.line,
                    tok.location.column,
                    tok.kind.name(),
                    tok.lexeme.escape_debug()
                );
            }
            report(&source, &filename, &diag, config.diagnostics.color && !cli.no_color);
            if diag.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::Parse { file, json } => {
            let source = read_source(&file);
            let config = load_config(explicit, Some(&file));
            let filename = file.display().to_string();
            let (program, diag) = nemc::parse(&source, &filename);
            if json {
                match serde_json::to_string_pretty(&program) {
                    Ok(text) => println!("{text}"),
                    Err(e) => fail(format!("could not serialize AST: {e}")),
                }
            } else {
                println!("{program:#?}");
            }
            report(&source, &filename, &diag, config.diagnostics.color && !cli.no_color);
            if diag.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file);
            let config = load_config(explicit, Some(&file));
            let filename = file.display().to_string();
            let out = nemc::check_source(&source, &filename, &config.const_env());
            report(&source, &filename, &out.diagnostics, config.diagnostics.color && !cli.no_color);

            for (name, value) in out.constants.iter() {
                println!("{name} = {value}");
            }
            let errors = out.diagnostics.error_count();
            let warnings = out.diagnostics.warning_count();
            eprintln!("{filename}: {errors} error(s), {warnings} warning(s)");
            if errors > 0 || (config.diagnostics.deny_warnings && warnings > 0) {
                std::process::exit(1);
            }
        }
        Commands::Fmt { file, check } => {
            let source = read_source(&file);
            let config = load_config(explicit, Some(&file));
            let filename = file.display().to_string();
            let formatted = match nemc::format_source(&source, &filename) {
                Ok(text) => text,
                Err(diag) => {
                    report(&source, &filename, &diag, config.diagnostics.color && !cli.no_color);
                    std::process::exit(1);
                }
            };
            if check {
                if formatted != source {
                    eprintln!("{filename}: not formatted");
                    std::process::exit(1);
                }
            } else {
                print!("{formatted}");
            }
        }
        Commands::Eval { expr, define } => {
            let config = load_config(explicit, None);
            let mut env = config.const_env();
            env.extend(define);

            let (parsed, diag) = nemc::parse_expression(&expr, "<expr>");
            report(&expr, "<expr>", &diag, config.diagnostics.color && !cli.no_color);
            let Some(parsed) = parsed.filter(|_| !diag.has_errors()) else {
                std::process::exit(1);
            };
            match nemc::evaluate(&parsed, &env) {
                Ok(value) => println!("{value}"),
                Err(e) => fail(e),
            }
        }
    }
}
