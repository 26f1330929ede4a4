use crate::commands::pools::fetch_pools;
use crate::error::AppError;
use crate::miner::{OutputStream, SupervisorEvent, SupervisorState};
use crate::pools::PoolEntry;
use crate::state::AppState;

/// Which pool command to run: an index into the downloaded list, or a literal template.
#[derive(Debug, Clone)]
pub enum PoolChoice {
    Index(usize),
    Template(String),
}

/// Picks the pool template, fetching the list if the choice is an index.
pub async fn choose_template(
    state: &AppState,
    choice: PoolChoice,
    retries: u32,
) -> Result<String, AppError> {
    match choice {
        PoolChoice::Template(template) => Ok(template),
        PoolChoice::Index(index) => {
            fetch_pools(state, retries).await?;
            let entry: PoolEntry = state.pools.select(index)?;
            if let Some(page) = entry.status_page_url() {
                println!("Pool status page: {page}");
            }
            Ok(entry.to_string())
        }
    }
}

/// `mine`: run the miner until Ctrl-C or until it exits on its own.
pub async fn mine(
    state: &AppState,
    address: &str,
    choice: PoolChoice,
    retries: u32,
) -> Result<(), AppError> {
    let template = choose_template(state, choice, retries).await?;
    state.miner.configure(&template, address)?;
    let mut events = state
        .take_miner_events()
        .ok_or_else(|| AppError::ProcessRuntime("miner events already taken".into()))?;

    if let Some(command) = state.miner.resolved_command() {
        println!("Starting: {}", command.command_line());
    }
    state.miner.start().await?;
    println!(
        "Mining started, logging to {} (Ctrl-C to stop)",
        state.miner.log_path().display()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping miner...");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                if print_event(&event) {
                    break;
                }
            }
        }
    }

    state.miner.shutdown().await?;
    println!("Mining stopped");
    Ok(())
}

/// Prints one event. Returns true once the miner has stopped.
fn print_event(event: &SupervisorEvent) -> bool {
    match event {
        SupervisorEvent::Output(out) => match out.stream {
            OutputStream::Stdout => println!("{}", out.line),
            OutputStream::Stderr => eprintln!("{}", out.line),
        },
        SupervisorEvent::ErrorOccurred(err) => eprintln!("{}", err.message()),
        SupervisorEvent::Exited { code } => match code {
            Some(code) => println!("Miner exited with code {code}"),
            None => println!("Miner exited"),
        },
        SupervisorEvent::StateChanged(SupervisorState::Stopped) => return true,
        SupervisorEvent::StateChanged(_) => {}
    }
    false
}
