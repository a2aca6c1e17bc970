use std::io::{self, Write};

use casabot::config::{load_config, save_config, CasabotConfig};
use casabot::logging::init_logging;
use casabot::providers;
use casabot::runtime::{run_repl, spawn_interrupt_listener, spawn_stdin_reader, Session};
use casabot_agent::{Agent, CasabotPaths};
use conversation_store::ConversationStore;
use tokio::sync::mpsc;

const USAGE: &str = "usage: casabot [reset]";

#[tokio::main]
async fn main() -> io::Result<()> {
    init_logging();
    let paths = CasabotPaths::resolve()?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => {}
        Some("reset") => {
            save_config(&paths, &CasabotConfig::default()).map_err(io::Error::other)?;
            println!("✅ Settings have been reset.");
            return Ok(());
        }
        Some("-h" | "--help" | "help") => {
            println!("{USAGE}");
            return Ok(());
        }
        Some(other) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown command '{other}'; {USAGE}"),
            ));
        }
    }

    paths.ensure_directories()?;
    let config = load_config(&paths.config_file).map_err(io::Error::other)?;
    let provider = providers::provider_from_env(&config).map_err(io::Error::other)?;
    let profile = provider.profile();

    let store = ConversationStore::new(paths.history.clone());
    let agent = Agent::new(provider, store, paths.clone());
    let mut session = Session::new(agent, paths.skills.clone()).map_err(io::Error::other)?;

    let (events_tx, mut events) = mpsc::unbounded_channel();
    spawn_stdin_reader(events_tx.clone())?;
    spawn_interrupt_listener(events_tx);

    let mut output = io::stdout();
    writeln!(
        output,
        "casabot · {}/{} · type /help for commands",
        profile.provider_id, profile.model_id
    )?;
    run_repl(&mut session, &mut events, &mut output).await
}
