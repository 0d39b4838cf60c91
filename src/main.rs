use clap::Parser;
use std::path::PathBuf;

/// Virtual Lab - staged research sessions with simulated expert meetings
#[derive(Parser, Debug)]
#[command(name = "virtual-lab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to bind the server to
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Fixed auth token (or set VIRTUAL_LAB_TOKEN env var)
    /// If not provided, a random token is generated on each startup
    #[arg(long, env = "VIRTUAL_LAB_TOKEN")]
    token: Option<String>,

    /// Directory holding sessions, config.toml and prompts.json
    #[arg(long, env = "VIRTUAL_LAB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Allowed CORS origins, comma separated. Any origin when omitted.
    #[arg(long, env = "VIRTUAL_LAB_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Option<Vec<String>>,
}

fn main() {
    let cli = Cli::parse();

    env_logger::init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(cli)) {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    use virtual_lab_lib::config::ConfigState;
    use virtual_lab_lib::file_storage::{default_data_dir, ensure_dir};
    use virtual_lab_lib::server::{self, generate_auth_token, ServerAppState};
    use virtual_lab_lib::shutdown::{register_signal_handlers, ShutdownState};
    use virtual_lab_lib::templates::PromptLibrary;

    let shutdown_state = ShutdownState::new();
    if let Err(e) = register_signal_handlers(shutdown_state.clone()) {
        log::warn!("Failed to register signal handlers: {}", e);
    }

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    ensure_dir(&data_dir)?;
    log::info!("Using data directory {:?}", data_dir);

    let config_state = ConfigState::load(&data_dir);

    let prompts = PromptLibrary::load(&data_dir).unwrap_or_else(|e| {
        log::warn!("Using builtin prompts, edits will not be saved: {}", e);
        PromptLibrary::builtin()
    });

    // Use provided token or generate a random one
    let auth_token = cli.token.unwrap_or_else(generate_auth_token);

    let state = ServerAppState::new(
        auth_token,
        &data_dir,
        config_state,
        prompts,
        shutdown_state,
    );

    server::run_server(cli.port, &cli.bind, state, cli.cors_origins).await
}
