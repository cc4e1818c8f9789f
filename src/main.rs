//! `wasmload`: parse WebAssembly binaries and print an objdump-style listing.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::Parser as ClapParser;

use wasmload::logging::setup_logging;
use wasmload::parser::{DumpFormat, Module, Parser, ParserConfig};

#[derive(ClapParser)]
#[command(name = "wasmload")]
#[command(about = "Parse WebAssembly binaries and dump their sections")]
#[command(version)]
struct Cli {
    /// Parser configuration as JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print section headers only (the default)
    #[arg(long, conflicts_with = "details")]
    headers: bool,

    /// Print the contents of every section
    #[arg(short = 'x', long)]
    details: bool,

    /// Log each section as it is decoded
    #[arg(short, long)]
    verbose: bool,

    /// WebAssembly binaries to parse
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

enum Outcome {
    Parsed(Module),
    Failed(String),
}

fn load(parser: &Parser<'_>, path: &Path) -> Outcome {
    let display = path.display().to_string();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return Outcome::Failed(format!("{}: {}", display, e)),
    };
    match parser.parse_named(&display, &bytes) {
        Ok(module) => Outcome::Parsed(module),
        Err(e) => Outcome::Failed(format!("{}: {}", display, e)),
    }
}

/// Parses `files` on at most `workers` threads sharing one read-only parser.
/// Outcomes come back in input order.
fn load_all(parser: &Parser<'_>, files: &[PathBuf], workers: usize) -> Vec<Outcome> {
    if files.is_empty() {
        return vec![];
    }
    let chunk_size = files.len().div_ceil(workers.max(1));
    thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(|path| load(parser, path)).collect::<Vec<_>>()))
            .collect();
        handles
            .into_iter()
            .zip(files.chunks(chunk_size))
            .flat_map(|(handle, chunk)| {
                handle.join().unwrap_or_else(|_| {
                    chunk
                        .iter()
                        .map(|path| Outcome::Failed(format!("{}: parser thread panicked", path.display())))
                        .collect()
                })
            })
            .collect()
    })
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => match ParserConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(2);
            }
        },
        None => ParserConfig::default(),
    };
    let format = if cli.details {
        DumpFormat::Details
    } else {
        DumpFormat::Headers
    };

    let parser = Parser::new(config);
    let workers = thread::available_parallelism().map_or(1, |n| n.get());
    let outcomes = load_all(&parser, &cli.files, workers);

    let mut failed = false;
    for outcome in outcomes {
        match outcome {
            Outcome::Parsed(module) => {
                println!("{}", module.to_string(format));
                for warning in &module.warnings {
                    eprintln!("{}: warning: {}", module.name, warning);
                }
            }
            Outcome::Failed(message) => {
                eprintln!("{}", message);
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmload::parser::encoding::{module_bytes, SECTION_TYPE};

    fn write_inputs(dir: &Path, count: usize) -> Vec<PathBuf> {
        fs::create_dir_all(dir).expect("Failed to create input directory");
        (0..count)
            .map(|i| {
                let path = dir.join(format!("m{}.wasm", i));
                // every third file is not a module
                let bytes = if i % 3 == 2 {
                    b"not wasm".to_vec()
                } else {
                    module_bytes(&[(SECTION_TYPE, vec![0x00])])
                };
                fs::write(&path, bytes).expect("Failed to write input");
                path
            })
            .collect()
    }

    #[test]
    fn test_load_all_keeps_input_order_on_few_workers() {
        let dir = std::env::temp_dir().join(format!("wasmload-load-all-{}", process::id()));
        let files = write_inputs(&dir, 7);
        let parser = Parser::default();

        for workers in [1, 2, 3, 16] {
            let outcomes = load_all(&parser, &files, workers);
            assert_eq!(outcomes.len(), files.len());
            for (i, (outcome, path)) in outcomes.iter().zip(&files).enumerate() {
                match outcome {
                    Outcome::Parsed(module) => {
                        assert_ne!(i % 3, 2, "{} parsed", path.display());
                        assert_eq!(module.name, path.display().to_string());
                    }
                    Outcome::Failed(message) => {
                        assert_eq!(i % 3, 2, "{}", message);
                        assert!(message.starts_with(&path.display().to_string()));
                    }
                }
            }
        }
        assert!(load_all(&parser, &[], 4).is_empty());
        let _ = fs::remove_dir_all(&dir);
    }
}
