//! Line-oriented controller console
//!
//! The reader loop forwards typed lines to the session; a writer task prints
//! replies, events and a periodic traffic table until the session ends.

use std::fmt::Write as _;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::sim::scoring::ScoreSnapshot;
use crate::sim::session::SessionHandle;
use crate::util::time::FRAME_TPS;

use super::protocol::{AircraftSnapshot, CommandReply, ConsoleInput, EndReason, SimEvent, SimMsg};

/// Snapshots between two traffic tables (about five seconds of frames)
const TABLE_EVERY_SNAPSHOTS: u64 = FRAME_TPS as u64 * 5;

/// Console errors
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Console writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

/// Run the console until input ends, `QUIT` is typed or the session ends.
///
/// `snapshot_rx` should be subscribed before the session starts so the
/// welcome line is not missed.
pub async fn run_console<R, W>(
    handle: SessionHandle,
    snapshot_rx: broadcast::Receiver<SimMsg>,
    input: R,
    output: W,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (line_tx, line_rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(write_output(output, snapshot_rx, line_rx));

    let mut lines = input.lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            info!("Console input closed");
            let _ = handle.shutdown().await;
            break;
        };

        match ConsoleInput::parse(&line) {
            None => continue,
            Some(ConsoleInput::Quit) => {
                info!("Controller quit");
                let _ = handle.shutdown().await;
                break;
            }
            Some(ConsoleInput::FastForward) => {
                if handle.toggle_fast_forward().await.is_err() {
                    break;
                }
            }
            Some(ConsoleInput::Command { text }) => match handle.submit(text).await {
                Ok(reply) => {
                    if line_tx.send(render_reply(&reply)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Command not delivered");
                    break;
                }
            },
        }
    }

    drop(line_tx);
    writer.await??;
    Ok(())
}

/// Writer task: session output and command replies -> console
async fn write_output<W>(
    mut output: W,
    mut snapshot_rx: broadcast::Receiver<SimMsg>,
    mut line_rx: mpsc::Receiver<String>,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let mut snapshots = 0u64;
    let mut replies_open = true;

    loop {
        let text = tokio::select! {
            line = line_rx.recv(), if replies_open => match line {
                Some(line) => line,
                None => {
                    replies_open = false;
                    continue;
                }
            },
            msg = snapshot_rx.recv() => match msg {
                Ok(msg) => {
                    let finished = matches!(msg, SimMsg::SessionEnd { .. });
                    if matches!(msg, SimMsg::Snapshot { .. }) {
                        snapshots += 1;
                    }
                    let show_table = snapshots % TABLE_EVERY_SNAPSHOTS == 1;
                    if let Some(text) = render_message(&msg, show_table) {
                        output.write_all(text.as_bytes()).await?;
                        output.flush().await?;
                    }
                    if finished {
                        break;
                    }
                    continue;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(lagged_count = n, "Console lagged, skipping messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        output.write_all(text.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(())
}

/// One reply line for a submitted directive
pub fn render_reply(reply: &CommandReply) -> String {
    match reply {
        CommandReply::Accepted { ack } => format!("> {}\n", ack),
        CommandReply::Rejected { message, .. } => format!("! {}\n", message),
    }
}

/// Console text for a session message; `None` when there is nothing to show
pub fn render_message(msg: &SimMsg, show_table: bool) -> Option<String> {
    match msg {
        SimMsg::Welcome {
            session_id,
            airport,
            seed,
        } => Some(format!(
            "Approach control {} (session {}, seed {}). Type FF to toggle fast-forward, QUIT to end.\n",
            airport, session_id, seed
        )),
        SimMsg::FastForward { enabled } => Some(format!(
            "Fast-forward {}\n",
            if *enabled { "on" } else { "off" }
        )),
        SimMsg::Snapshot {
            elapsed_secs,
            aircraft,
            score,
            events,
            ..
        } => {
            let mut out = String::new();
            for event in events {
                if let Some(line) = render_event(event) {
                    let _ = writeln!(out, "[{}] {}", clock(*elapsed_secs), line);
                }
            }
            if show_table {
                out.push_str(&render_table(aircraft));
                let _ = writeln!(out, "{}", render_score(score));
            }
            (!out.is_empty()).then_some(out)
        }
        SimMsg::SessionEnd {
            reason,
            duration_secs,
            score,
            ..
        } => {
            let why = match reason {
                EndReason::Collision { first, second } => {
                    format!("collision between {} and {}", first, second)
                }
                EndReason::Shutdown => "shutdown".to_string(),
            };
            Some(format!(
                "Session over after {} ({}). {}\n",
                clock(*duration_secs),
                why,
                render_score(score)
            ))
        }
    }
}

fn render_event(event: &SimEvent) -> Option<String> {
    let line = match event {
        SimEvent::Spawned { callsign, altitude } => {
            format!("{} with you at {:.0} ft", callsign, altitude)
        }
        SimEvent::DirectiveApplied { .. } => return None,
        SimEvent::Established { callsign, runway } => {
            format!("{} established ILS {}", callsign, runway)
        }
        SimEvent::Touchdown { callsign, runway } => {
            format!("{} touchdown runway {}", callsign, runway)
        }
        SimEvent::Landed { callsign, runway } => {
            format!("{} vacated runway {}", callsign, runway)
        }
        SimEvent::GoAround {
            callsign,
            runway,
            reason,
        } => format!("{} going around from {} ({})", callsign, runway, reason.as_str()),
        SimEvent::Exited { callsign } => format!("{} left the airspace", callsign),
        SimEvent::SeparationLost { first, second } => {
            format!("SEPARATION LOST {} / {}", first, second)
        }
        SimEvent::SeparationRestored => "separation restored".to_string(),
        SimEvent::Collision { first, second } => format!("COLLISION {} / {}", first, second),
    };
    Some(line)
}

/// Fixed-width traffic table
pub fn render_table(aircraft: &[AircraftSnapshot]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<8} {:<15} {:>3}  {:>5}  {:>3}  {:>7} {:>7}  {:>4}",
        "CALLSIGN", "MODE", "HDG", "ALT", "SPD", "X", "Y", "RWY"
    );
    for a in aircraft {
        let mode = serde_json::to_value(a.mode)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{} {:<8} {:<15} {:03.0}  {:>5.0}  {:>3.0}  {:>7.1} {:>7.1}  {:>4}",
            if a.violation { '!' } else { ' ' },
            a.callsign,
            mode,
            a.heading,
            a.altitude,
            a.speed,
            a.x,
            a.y,
            a.runway.as_deref().unwrap_or("-"),
        );
    }
    out
}

pub fn render_score(score: &ScoreSnapshot) -> String {
    format!(
        "landings {}  violation {:.1}s  improper exits {}  go-arounds {}",
        score.landings, score.violation_secs, score.improper_exits, score.missed_approaches
    )
}

/// mm:ss of simulated time
fn clock(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
