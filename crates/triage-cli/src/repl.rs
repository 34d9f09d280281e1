//! Line-oriented review loop.
//!
//! Generation runs as a background task so the user can keep navigating
//! while a request is in flight; its result is applied through the
//! session's ticket check and dropped if the user has moved on.

use std::io::ErrorKind;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use triage_core::{Error, HostGraph, InferenceBackend, InferenceResult, MessageKind, Result};
use triage_inference::generate_insights;
use triage_review::{InferenceTicket, ReviewSession};

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Generate,
    Save,
    Delete,
    Reload,
    View,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "n" | "next" | "" => Ok(Self::Next),
            "p" | "prev" | "previous" => Ok(Self::Previous),
            "g" | "generate" => Ok(Self::Generate),
            "s" | "save" => Ok(Self::Save),
            "d" | "delete" => Ok(Self::Delete),
            "r" | "reload" => Ok(Self::Reload),
            "v" | "view" => Ok(Self::View),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command {:?} (h for help)", other)),
        }
    }
}

struct Inflight {
    ticket: InferenceTicket,
    handle: JoinHandle<Result<InferenceResult>>,
}

enum Event {
    Line(Option<String>),
    Unreadable(std::io::Error),
    Inference(Option<(InferenceTicket, Result<InferenceResult>)>),
}

/// Run the review loop on stdin until the user quits or stdin closes.
pub async fn run(
    session: ReviewSession,
    host: Arc<dyn HostGraph>,
    backend: Arc<dyn InferenceBackend>,
) -> anyhow::Result<()> {
    run_with_input(session, host, backend, BufReader::new(tokio::io::stdin())).await
}

/// Run the review loop over any line source.
///
/// A line that is not valid UTF-8 is reported and skipped; only end of
/// input or another I/O error ends the loop.
pub async fn run_with_input<R>(
    mut session: ReviewSession,
    host: Arc<dyn HostGraph>,
    backend: Arc<dyn InferenceBackend>,
    input: R,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("{}", render::HEADER);
    if let Err(e) = session.open().await {
        report(host.as_ref(), &e).await;
    }
    println!("{}", render::page_view(&session));

    let mut lines = input.lines();
    let mut inflight: Option<Inflight> = None;

    loop {
        let event = tokio::select! {
            line = lines.next_line() => match line {
                Ok(line) => Event::Line(line),
                Err(e) if e.kind() == ErrorKind::InvalidData => Event::Unreadable(e),
                Err(e) => return Err(e.into()),
            },
            done = wait_inflight(&mut inflight) => Event::Inference(done),
        };

        match event {
            Event::Line(None) => break,
            Event::Unreadable(e) => {
                let message = format!("Ignored unreadable input: {}", e);
                eprintln!("{}", message);
                let _ = host.show_message(&message, MessageKind::Warning).await;
            }
            Event::Line(Some(line)) => {
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                handle(command, &mut session, host.as_ref(), &backend, &mut inflight).await;
            }
            Event::Inference(Some((ticket, outcome))) => {
                match session.apply_inference(&ticket, outcome) {
                    Ok(true) => println!("{}", render::page_view(&session)),
                    Ok(false) => debug!(page_id = %ticket.page_id(), "Dropped stale insights"),
                    Err(e) => report(host.as_ref(), &e).await,
                }
            }
            Event::Inference(None) => {}
        }
    }

    session.close();
    info!("Review session closed");
    Ok(())
}

async fn handle(
    command: Command,
    session: &mut ReviewSession,
    host: &dyn HostGraph,
    backend: &Arc<dyn InferenceBackend>,
    inflight: &mut Option<Inflight>,
) {
    let outcome = match command {
        Command::Next => session.next().await,
        Command::Previous => session.previous().await,
        Command::Reload => session.load_initial().await,
        Command::Delete => match session.delete_current().await {
            Ok(page) => {
                notify(host, &format!("Deleted {}", page.original_name)).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
        Command::Save => match session.save_current().await {
            Ok(name) => {
                notify(host, &format!("Saved {}", name)).await;
                Ok(())
            }
            Err(e) => Err(e),
        },
        Command::Generate => match session.begin_inference() {
            Ok(ticket) => {
                let backend = backend.clone();
                let page = ticket.page().clone();
                let handle =
                    tokio::spawn(async move { generate_insights(backend.as_ref(), &page).await });
                // A previous request keeps running; its ticket is already stale.
                *inflight = Some(Inflight { ticket, handle });
                Ok(())
            }
            Err(e) => Err(e),
        },
        Command::View | Command::Quit => Ok(()),
        Command::Help => {
            println!("{}", render::HELP);
            return;
        }
    };

    if let Err(e) = outcome {
        report(host, &e).await;
    }
    println!("{}", render::page_view(session));
}

/// Resolve with the in-flight request's outcome, or never if there is none.
async fn wait_inflight(
    inflight: &mut Option<Inflight>,
) -> Option<(InferenceTicket, Result<InferenceResult>)> {
    let joined = match inflight.as_mut() {
        Some(job) => (&mut job.handle).await,
        None => std::future::pending().await,
    };
    let job = inflight.take()?;
    let outcome = joined.unwrap_or_else(|e| {
        Err(Error::InferenceHttp {
            status: None,
            message: format!("generation task failed: {}", e),
        })
    });
    Some((job.ticket, outcome))
}

async fn notify(host: &dyn HostGraph, message: &str) {
    println!("{}", message);
    let _ = host.show_message(message, MessageKind::Success).await;
}

async fn report(host: &dyn HostGraph, error: &Error) {
    let message = error.to_string();
    eprintln!("{}", message);
    let _ = host.show_message(&message, MessageKind::Error).await;
}
