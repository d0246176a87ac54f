#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use pyport::convert_cmd::{self, ConvertOptions};
use pyport::core::Credentials;
use pyport::engine::{InterpreterConfig, ToolchainConfig};
use pyport::provider::ProviderKind;
use pyport::reference_cmd;
use pyport::{PortError, PortResult};

#[derive(Parser, Debug)]
#[command(name = "pyport")]
#[command(
    about = "Port Python programs to C++ via generative providers and verify the result by compiling and running it",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging and fragment echoing (or set PYPORT_LOG)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Provider selection for one invocation.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderSelect {
    Gpt,
    Claude,
    Both,
}

impl ProviderSelect {
    fn kinds(self) -> Vec<ProviderKind> {
        match self {
            ProviderSelect::Gpt => vec![ProviderKind::Gpt],
            ProviderSelect::Claude => vec![ProviderKind::Claude],
            ProviderSelect::Both => vec![ProviderKind::Gpt, ProviderKind::Claude],
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert Python source to C++ and verify by compiling and running
    #[command(group(clap::ArgGroup::new("input").required(true).args(["file", "code"])))]
    Convert {
        /// Path to the Python source file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Inline Python source
        #[arg(long)]
        code: Option<String>,
        /// Provider(s) to convert with
        #[arg(long, value_enum, default_value_t = ProviderSelect::Gpt)]
        provider: ProviderSelect,
        /// Output-token ceiling (applies to the single-shot provider style)
        #[arg(long, default_value_t = 2000)]
        max_tokens: u32,
        /// Directory artifacts are persisted under
        #[arg(long, default_value = "artifacts")]
        artifact_dir: PathBuf,
        /// Compiler binary
        #[arg(long)]
        compiler: Option<PathBuf>,
        /// Disable the target micro-architecture tuning flags
        #[arg(long)]
        no_tuning: bool,
        /// Compile only; do not run the produced binary
        #[arg(long)]
        no_run: bool,
        /// Interpreter binary for the baseline run
        #[arg(long)]
        interpreter: Option<PathBuf>,
        /// Per-request and per-stage timeout in seconds (0 = none)
        #[arg(long, default_value_t = 300)]
        timeout: u64,
        /// Also run the original source for a baseline
        #[arg(long)]
        reference: bool,
        /// Write machine-readable JSON reports to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Run only the original source and print its baseline output
    #[command(group(clap::ArgGroup::new("input").required(true).args(["file", "code"])))]
    Reference {
        /// Path to the Python source file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Inline Python source
        #[arg(long)]
        code: Option<String>,
        /// Interpreter binary
        #[arg(long)]
        interpreter: Option<PathBuf>,
        /// Run timeout in seconds (0 = none)
        #[arg(long, default_value_t = 300)]
        timeout: u64,
        /// Write a machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("PYPORT_LOG").unwrap_or_else(|_| {
        if verbose { "pyport=debug".to_string() } else { "pyport=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn load_source(file: Option<PathBuf>, code: Option<String>) -> PortResult<String> {
    match (file, code) {
        (Some(path), _) => std::fs::read_to_string(&path)
            .map_err(|e| PortError::Message(format!("failed to read {}: {e}", path.display()))),
        (None, Some(code)) => Ok(code),
        (None, None) => Err(PortError::Message("no input: pass --file or --code".into())),
    }
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            file,
            code,
            provider,
            max_tokens,
            artifact_dir,
            compiler,
            no_tuning,
            no_run,
            interpreter,
            timeout,
            reference,
            json,
        } => load_source(file, code).and_then(|source| {
            let stage_timeout = Duration::from_secs(timeout);
            let mut toolchain = ToolchainConfig::default().with_timeout(stage_timeout);
            if let Some(compiler) = compiler {
                toolchain.compiler = compiler;
            }
            if no_tuning {
                toolchain.tuning_flags.clear();
            }
            let mut interpreter_config = InterpreterConfig::default().with_timeout(stage_timeout);
            if let Some(interpreter) = interpreter {
                interpreter_config.interpreter = interpreter;
            }

            let mut options = ConvertOptions::new(source, provider.kinds());
            options.max_output_tokens = max_tokens;
            options.artifact_dir = artifact_dir;
            options.toolchain = toolchain;
            options.interpreter = interpreter_config;
            options.run_binary = !no_run;
            options.run_reference = reference;
            options.echo_stream = cli.verbose;
            options.request_timeout = stage_timeout;
            options.json_out = json;

            let credentials = Credentials::from_env();
            convert_cmd::run(&options, &credentials)
        }),

        Commands::Reference { file, code, interpreter, timeout, json } => {
            load_source(file, code).and_then(|source| {
                let mut config =
                    InterpreterConfig::default().with_timeout(Duration::from_secs(timeout));
                if let Some(interpreter) = interpreter {
                    config.interpreter = interpreter;
                }
                reference_cmd::run(&source, config, json)
            })
        }
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
