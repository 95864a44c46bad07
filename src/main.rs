// stepscope: step-through tracer for short scripts with data-structure views

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use stepscope::config::{StepBudget, TracerConfig};
use stepscope::transport::{run_code, InProcessSandbox, TraceRequest};
use stepscope::ui::App;

/// Trace a script statement by statement and inspect every step
#[derive(Parser)]
#[command(name = "stepscope", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace a script and print the trace as JSON
    Run {
        #[command(flatten)]
        trace: TraceArgs,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Trace a script and open the terminal viewer
    View {
        #[command(flatten)]
        trace: TraceArgs,

        /// Where to write logs (default: stepscope.log in the temp directory)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TraceArgs {
    /// Script to trace
    file: PathBuf,

    /// Step budget; values below 10 or non-numeric become 10
    #[arg(short, long)]
    steps: Option<String>,

    /// Value for `input()`, in order; repeat for several
    #[arg(short, long = "input")]
    inputs: Vec<String>,

    /// TOML file with tracer settings
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl TraceArgs {
    /// Config file (if any) overridden by flags, plus the request to send
    fn prepare(&self) -> Result<(String, TracerConfig, TraceRequest), Box<dyn std::error::Error>> {
        if !self.file.exists() {
            return Err(format!("file '{}' not found", self.file.display()).into());
        }
        let source = fs::read_to_string(&self.file)?;

        let mut config = match &self.config {
            Some(path) => TracerConfig::load(path)?,
            None => TracerConfig::default(),
        };
        if let Some(steps) = &self.steps {
            config.step_budget = StepBudget::parse(steps);
        }

        let request = TraceRequest::new(source.clone(), config.step_budget, self.inputs.clone());
        Ok((source, config, request))
    }
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn init_file_logging(path: &Path) -> io::Result<()> {
    let log_file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();
    Ok(())
}

fn run(trace: &TraceArgs, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    init_stderr_logging();
    let (_, config, request) = trace.prepare()?;
    let result = run_code(&InProcessSandbox::new(config), &request);
    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);
    Ok(())
}

fn view(trace: &TraceArgs, log_file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = log_file.unwrap_or_else(|| std::env::temp_dir().join("stepscope.log"));
    init_file_logging(&log_path)?;
    let (source, config, request) = trace.prepare()?;
    let mut app = App::new(source, request, Box::new(InProcessSandbox::new(config)));

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { trace, pretty } => run(&trace, pretty),
        Commands::View { trace, log_file } => view(&trace, log_file),
    };
    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
