use clap::{Parser, Subcommand};
use lib::catalog::ModelSelection;
use lib::connectivity::ConnectivityState;
use lib::controller::{Controller, StatusReport};
use lib::session::{Message, Role};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "AI Nexus CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config and settings).
    Init {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Check whether the server is online and list its models.
    Status {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// List the models the server offers, marking the selected ones.
    Models {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Show the server's stored query/answer history.
    History {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Show at most this many entries.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Chat with the server (interactive). Type /help for commands.
    Chat {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print a stored setting (e.g. apiUrl, online_models, interfaceMode).
    Get {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        key: String,
    },

    /// Store a setting. The value is parsed as JSON, or stored as a string if it is not JSON.
    Set {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        key: String,
        value: String,
    },

    /// Replace the model selection sent with each chat request.
    Select {
        /// Config file path (default: NEXUS_CONFIG_PATH or ~/.nexus/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Online model id (repeatable).
        #[arg(long = "online", value_name = "MODEL")]
        online: Vec<String>,

        /// Offline model id (repeatable).
        #[arg(long = "offline", value_name = "MODEL")]
        offline: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut exit_code = 0;
    let result = match cli.command {
        Some(Commands::Version) => {
            println!("nexus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config).map_err(|e| ("init", e)),
        Some(Commands::Status { config }) => match run_status(config).await {
            Ok(state) => {
                exit_code = status_exit_code(state);
                Ok(())
            }
            Err(e) => Err(("status", e)),
        },
        Some(Commands::Models { config }) => run_models(config).await.map_err(|e| ("models", e)),
        Some(Commands::History { config, limit }) => {
            run_history(config, limit).await.map_err(|e| ("history", e))
        }
        Some(Commands::Chat { config }) => run_chat(config).await.map_err(|e| ("chat", e)),
        Some(Commands::Get { config, key }) => run_get(config, &key).map_err(|e| ("get", e)),
        Some(Commands::Set { config, key, value }) => {
            run_set(config, &key, &value).map_err(|e| ("set", e))
        }
        Some(Commands::Select {
            config,
            online,
            offline,
        }) => run_select(config, online, offline).map_err(|e| ("select", e)),
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err((what, e)) = result {
        log::error!("{} failed: {:#}", what, e);
        std::process::exit(1);
    }
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// `nexus status` exits 2 when the server is not connected.
fn status_exit_code(state: ConnectivityState) -> i32 {
    if state.is_connected() {
        0
    } else {
        2
    }
}

fn open_controller(config_path: Option<PathBuf>) -> anyhow::Result<Controller> {
    let (config, path) = lib::config::load_config(config_path)?;
    Ok(Controller::open(config, &path))
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn print_status(c: &Controller, report: &StatusReport) {
    println!("{}: {}", c.api_url(), report.state.label());
    if let Some(notice) = &report.catalog_notice {
        eprintln!("warning: {}", notice);
    }
}

fn print_models(c: &Controller) {
    let selection = c.model_selection();
    let catalog = c.catalog();
    if catalog.is_empty() {
        println!("(no models)");
        return;
    }
    let mark = |selected: bool| if selected { "*" } else { " " };
    println!("online:");
    for m in &catalog.online {
        println!("  {} {}", mark(selection.online.contains(m)), m);
    }
    println!("offline:");
    for m in &catalog.offline {
        println!("  {} {}", mark(selection.offline.contains(m)), m);
    }
    let missing = selection.missing_from(catalog);
    if !missing.is_empty() {
        println!("selected but not offered: {}", missing.join(", "));
    }
}

async fn run_status(config_path: Option<PathBuf>) -> anyhow::Result<ConnectivityState> {
    let mut c = open_controller(config_path)?;
    let report = c.check_status().await;
    print_status(&c, &report);
    if report.state.is_connected() {
        print_models(&c);
    }
    Ok(report.state)
}

async fn run_models(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut c = open_controller(config_path)?;
    c.refresh_models().await?;
    print_models(&c);
    Ok(())
}

async fn run_history(config_path: Option<PathBuf>, limit: Option<usize>) -> anyhow::Result<()> {
    let mut c = open_controller(config_path)?;
    let entries = c.refresh_history().await?;
    if entries.is_empty() {
        println!("(no history)");
    }
    for e in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("[{}] {}", e.display_timestamp(), e.query);
        println!("  {}", e.answer.trim());
    }
    Ok(())
}

fn run_get(config_path: Option<PathBuf>, key: &str) -> anyhow::Result<()> {
    let c = open_controller(config_path)?;
    match c.settings().get_value(key) {
        Some(v) => println!("{}", v),
        None => println!("(unset)"),
    }
    Ok(())
}

fn run_set(config_path: Option<PathBuf>, key: &str, value: &str) -> anyhow::Result<()> {
    let mut c = open_controller(config_path)?;
    if key == lib::settings::KEY_API_URL {
        c.set_api_url(value)?;
        println!("{} = {:?}", key, c.api_url());
        return Ok(());
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    c.settings().set_value(key, value.clone())?;
    println!("{} = {}", key, value);
    Ok(())
}

fn run_select(
    config_path: Option<PathBuf>,
    online: Vec<String>,
    offline: Vec<String>,
) -> anyhow::Result<()> {
    let mut c = open_controller(config_path)?;
    let selection = ModelSelection::new(online, offline);
    c.set_model_selection(&selection)?;
    println!("online: {}", selection.online.join(", "));
    println!("offline: {}", selection.offline.join(", "));
    Ok(())
}

const CHAT_HELP: &str = "\
/help     show this help
/new      start a new conversation
/status   re-check the server
/models   list models (* = selected)
/history  show server history
/exit     quit";

fn print_reply(message: &Message) {
    match message.role {
        Role::Assistant => println!("< {}", message.content.trim()),
        Role::Error => eprintln!("! {}", message.content),
        Role::User => {}
    }
}

async fn run_chat(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let mut c = open_controller(config_path)?;
    let report = c.startup().await;
    print_status(&c, &report);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input.to_ascii_lowercase().as_str() {
            "/exit" | "/quit" => break,
            "/help" => {
                println!("{}", CHAT_HELP);
                continue;
            }
            "/new" => {
                c.reset_session();
                println!("(new conversation)");
                continue;
            }
            "/status" => {
                let report = c.check_status().await;
                print_status(&c, &report);
                continue;
            }
            "/models" => {
                print_models(&c);
                continue;
            }
            "/history" => {
                match c.refresh_history().await {
                    Ok(entries) => {
                        for e in entries {
                            println!("[{}] {}", e.display_timestamp(), e.query);
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
                continue;
            }
            _ => {}
        }

        if !c.connectivity().is_connected() {
            eprintln!("{} is not connected; use /status to retry", c.api_url());
            continue;
        }
        if c.send(input).await {
            if let Some(last) = c.session().transcript().last() {
                print_reply(last);
            }
        }
    }

    Ok(())
}
