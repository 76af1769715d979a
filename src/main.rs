mod debug_report;

use chatwarden::{AuthorId, CapabilityResult, FilterConfig, FilterService, MessageAuthor};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_AUTHOR: &str = "Steve";
const DEFAULT_CHAIN: &str = "chat";
const LOG_ENV: &str = "CHATWARDEN_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    init_logging();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("chatwarden=warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).without_time())
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<(), chatwarden::FilterError> {
    let mut builder = FilterService::builder();
    if let Some(path) = &cli.config {
        builder = builder.config(FilterConfig::load(path)?);
    }
    let service = builder.build()?;

    let chain = match &cli.rules {
        Some(path) => service.load_chain_file(&cli.chain, path)?,
        None => {
            let rules = service.config().rule_directory.join(format!("{}.txt", cli.chain));
            service.load_chain_file(&cli.chain, rules)?
        }
    };

    let palette = debug_report::Palette::new(cli.color);
    debug_report::print_chain(&chain, &palette);

    let author = Arc::new(CliAuthor::new(&cli.author, cli.permissions.clone()));
    for message in &cli.messages {
        let outcome = service.evaluate(&cli.chain, message, author.clone());
        debug_report::print_outcome(message, &outcome, &author.drain(), &palette);
    }
    if service.services().points().is_enabled() {
        let score = service.services().points().points(&author.id());
        debug_report::print_score(&cli.author, score, &palette);
    }
    Ok(())
}

// --- Author ---

/// Author whose capabilities are collected for the report instead of
/// touching any real session.
#[derive(Debug)]
struct CliAuthor {
    name: String,
    permissions: Vec<String>,
    effects: parking_lot::Mutex<Vec<String>>,
}

impl CliAuthor {
    fn new(name: &str, permissions: Vec<String>) -> Self {
        CliAuthor { name: name.to_string(), permissions, effects: parking_lot::Mutex::new(Vec::new()) }
    }

    fn record(&self, effect: String) -> CapabilityResult {
        self.effects.lock().push(effect);
        Ok(())
    }

    fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.effects.lock())
    }
}

impl MessageAuthor for CliAuthor {
    fn id(&self) -> AuthorId {
        AuthorId::new(self.name.to_ascii_lowercase())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    fn send_message(&self, message: &str) -> CapabilityResult {
        self.record(format!("message  {message}"))
    }

    fn kick(&self, message: &str) -> CapabilityResult {
        self.record(format!("kick     {message}"))
    }

    fn kill(&self, message: &str) -> CapabilityResult {
        self.record(format!("kill     {message}"))
    }

    fn fine(&self, amount: f64, message: &str) -> CapabilityResult {
        self.record(format!("fine {amount} {message}"))
    }

    fn execute_command(&self, command: &str) -> CapabilityResult {
        self.record(format!("command  /{command}"))
    }
}

// --- Arguments ---

struct Cli {
    rules: Option<PathBuf>,
    config: Option<PathBuf>,
    chain: String,
    author: String,
    permissions: Vec<String>,
    color: bool,
    messages: Vec<String>,
}

fn parse_args() -> Result<Cli, String> {
    let mut cli = Cli {
        rules: None,
        config: None,
        chain: DEFAULT_CHAIN.to_string(),
        author: DEFAULT_AUTHOR.to_string(),
        permissions: Vec::new(),
        color: io::stdout().is_terminal(),
        messages: Vec::new(),
    };
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("chatwarden {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => cli.color = true,
            "--no-color" => cli.color = false,
            "-r" | "--rules" => cli.rules = Some(PathBuf::from(value("--rules")?)),
            "-c" | "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--chain" => cli.chain = value("--chain")?,
            "-a" | "--author" => cli.author = value("--author")?,
            "-p" | "--permission" => cli.permissions.push(value("--permission")?),
            "--" => {
                cli.messages.push(args.by_ref().collect::<Vec<_>>().join(" "));
                break;
            }
            _ if arg.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            _ => {
                let rest = std::iter::once(arg).chain(args.by_ref()).collect::<Vec<_>>().join(" ");
                cli.messages.push(rest);
                break;
            }
        }
    }

    if cli.messages.is_empty() {
        cli.messages = read_stdin_messages()?;
    }
    cli.messages.retain(|m| !m.trim().is_empty());
    if cli.messages.is_empty() {
        return Err(format!("error: no message provided\n\n{}", help_text()));
    }
    Ok(cli)
}

/// One message per line.
fn read_stdin_messages() -> Result<Vec<String>, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer.lines().map(str::to_string).collect())
}

fn help_text() -> String {
    format!(
        "chatwarden {version}

Run messages through a filter rule chain and report what happened.

Usage:
  chatwarden [OPTIONS] [--] <message...>
  chatwarden [OPTIONS] < messages.txt      (one message per line)

Options:
  -r, --rules <file>         Rule file to load. Default: <rule_directory>/<chain>.txt
  -c, --config <file>        TOML configuration (messages, filters, points).
      --chain <name>         Chain name. Default: {chain}
  -a, --author <name>        Author name used for tags and scoring. Default: {author}
  -p, --permission <perm>    Grant the author a permission. Repeatable.
      --color                Force ANSI color output.
      --no-color             Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}             Log filter, e.g. chatwarden=debug

Exit codes:
  0  Success.
  1  Rules or configuration failed to load.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        chain = DEFAULT_CHAIN,
        author = DEFAULT_AUTHOR,
        log_env = LOG_ENV,
    )
}
