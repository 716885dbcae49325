use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use emterp::{Emterpreter, HostModule, StaticMemory, TransformOptions, render_diagnostic, render_error};
use emterp_core::api::options::{DEFAULT_STACK_CAPACITY, DEFAULT_STATIC_BASE};
use miette::Result;

/// Emterp - move asm.js functions into a bytecode interpreter
#[derive(Parser, Debug)]
#[command(name = "emterp")]
#[command(about = "Emterpretify an asm.js module", long_about = None)]
struct Args {
    /// Module carrying bytecode listings
    input: PathBuf,

    /// Where to write the transformed module (memory goes to <OUTPUT>.mem)
    output: PathBuf,

    /// Static memory initializer (default: <INPUT>.mem)
    #[arg(long)]
    mem: Option<PathBuf>,

    /// Declared static size in bytes (default: size of the memory initializer)
    #[arg(long)]
    static_size: Option<u32>,

    /// Absolute address of the first static byte
    #[arg(long, default_value_t = DEFAULT_STATIC_BASE)]
    static_base: u32,

    /// Bytes reserved for the interpreter stack
    #[arg(long, default_value_t = DEFAULT_STACK_CAPACITY)]
    stack_capacity: u32,

    /// Print the assembled bytecode
    #[arg(long)]
    dump_bytecode: bool,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
enum CliError {
    #[error("Failed to read {}", path.display())]
    #[diagnostic(code(emterp::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}", path.display())]
    #[diagnostic(code(emterp::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform failed ({code})")]
    #[diagnostic(code(emterp::transform))]
    Transform { code: &'static str },
}

/// `path` with `.mem` appended to its full file name.
fn mem_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".mem");
    PathBuf::from(name)
}

fn read_memory(path: &Path) -> Result<Option<Vec<u8>>, CliError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CliError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: &Args) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.input).map_err(|source| CliError::Read {
        path: args.input.clone(),
        source,
    })?;
    let mem_in = args.mem.clone().unwrap_or_else(|| mem_path(&args.input));
    let data = read_memory(&mem_in)?;
    tracing::info!(input = %args.input.display(), mem = %mem_in.display(), "emterpretifying");

    let options = TransformOptions {
        stack_capacity: args.stack_capacity,
        static_base: args.static_base,
    };
    let memory = data.as_deref().map(|data| match args.static_size {
        Some(size) => StaticMemory::with_size(data, size),
        None => StaticMemory::new(data),
    });

    let artifacts = HostModule::parse(&text)
        .and_then(|module| Emterpreter::new(options).run(&module, memory))
        .map_err(|e| {
            render_error(&e);
            CliError::Transform { code: e.code() }
        })?;

    for diagnostic in &artifacts.diagnostics {
        render_diagnostic(diagnostic);
    }
    if args.dump_bytecode {
        println!("{}", artifacts.disassemble());
    }

    write(&args.output, artifacts.module_text.as_bytes())?;
    write(&mem_path(&args.output), &artifacts.memory)?;

    println!("{}", artifacts.bindings.prelude);
    println!("{}", artifacts.bindings.env_entries.trim_end());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG environment variable to control log level
    // Default to WARN if not set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap();

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    run(&args)?;
    Ok(())
}
