//! `feed`: list users with their latest post, filtered by name.

mod config;
mod render;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use feed_core::{ApiClient, FetchState, Orchestrator, Transport, UreqTransport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config::{Args, CliError};
use render::render;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "feed failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, CliError> {
    args.validate()?;
    info!(base_url = %args.base_url, "starting");
    let mut orchestrator = Orchestrator::new(
        ApiClient::new(&args.base_url),
        UreqTransport::new(args.timeout()),
    );
    let mut stdout = std::io::stdout();
    match args.search {
        Some(term) => {
            let state = search_once(&orchestrator, term).await;
            show(&mut stdout, &state)?;
            Ok(ExitCode::from(exit_status(&state)))
        }
        None => {
            let input = BufReader::new(tokio::io::stdin());
            interactive(&mut orchestrator, input, &mut stdout).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One search, returned once settled.
async fn search_once<T: Transport + 'static>(
    orchestrator: &Orchestrator<T>,
    term: String,
) -> FetchState {
    orchestrator.fetch(term).await;
    orchestrator.state()
}

/// Process exit status for a settled state: 1 on `Error`, 0 otherwise.
fn exit_status(state: &FetchState) -> u8 {
    match state {
        FetchState::Error(_) => 1,
        _ => 0,
    }
}

fn show<W: Write>(out: &mut W, state: &FetchState) -> std::io::Result<()> {
    write!(out, "{}", render(state))?;
    out.flush()
}

/// List everyone, then run a new search per input line until EOF.
///
/// Every published state is rendered as it arrives. A line equal to the
/// current term starts nothing. After EOF the loop waits for the last search
/// to settle so piped input still prints a result.
async fn interactive<T, R, W>(
    orchestrator: &mut Orchestrator<T>,
    input: R,
    out: &mut W,
) -> Result<(), CliError>
where
    T: Transport + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut updates = orchestrator.subscribe();
    let mut lines = input.lines();
    let mut input_open = true;

    orchestrator.run("");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().state.clone();
                show(out, &state)?;
                if !input_open && state.is_settled() {
                    break;
                }
            }
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(term) if term == orchestrator.search_term() => {
                        debug!(search = %term, "search term unchanged");
                    }
                    Some(term) => {
                        orchestrator.run(term);
                    }
                    None => {
                        input_open = false;
                        if updates.borrow().state.is_settled() {
                            if updates.has_changed().unwrap_or(false) {
                                let state = updates.borrow_and_update().state.clone();
                                show(out, &state)?;
                            }
                            break;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
