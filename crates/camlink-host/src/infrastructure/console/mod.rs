//! Terminal control surface.
//!
//! Reads lines from stdin; each character of a line is one key (so `lm`
//! followed by Enter cycles the layout and toggles mirror).  After every
//! line the status panel is printed unless it has been hidden with `h`.
//!
//! ```text
//! camlink: 2 active | layout: AUTO (Split/Full) | mirror: off | selected: camera 1
//!   [1] 192.168.1.23     streaming     online   rot 90
//!   [2] 192.168.1.40     streaming     online   rot 0
//!   [-] 10.0.0.5         disconnected  offline  rot 0
//! keys: l layout  m mirror  r rotate  1/2 select  h hide  s json  q quit
//! ```
//!
//! The console is generic over its input and output streams so the same loop
//! runs against stdin/stdout in production and in-memory buffers in tests.
//! Stdin itself is read by [`forward_lines`] on a detached thread, because a
//! blocking read cannot be interrupted and must not hold up runtime shutdown.

use std::fmt::Write as _;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::control::{ControlCommand, ControlOutcome, ControlStatus, ControlUseCase};

const KEY_HELP: &str = "keys: l layout  m mirror  r rotate  1/2 select  h hide  s json  q quit";

/// Bytes buffered between the input thread and the console.
const FORWARD_BUFFER: usize = 4096;

/// Moves lines from a blocking reader onto an async one.
///
/// `source` is read on a plain thread that is never joined.  The returned
/// reader reaches end of input when `source` does; if the reader is dropped
/// first, the thread stops after its next line.
///
/// Must be called from within a Tokio runtime.
pub fn forward_lines<S>(source: S) -> std::io::Result<BufReader<DuplexStream>>
where
    S: std::io::BufRead + Send + 'static,
{
    let (mut writer, reader) = tokio::io::duplex(FORWARD_BUFFER);
    let runtime = tokio::runtime::Handle::current();
    std::thread::Builder::new()
        .name("camlink-console-input".to_string())
        .spawn(move || {
            for line in source.lines() {
                let Ok(mut line) = line else {
                    break;
                };
                line.push('\n');
                if runtime.block_on(writer.write_all(line.as_bytes())).is_err() {
                    break;
                }
            }
            debug!("console input thread finished");
        })?;
    Ok(BufReader::new(reader))
}

/// Formats the human-readable status panel.
pub fn render_panel(status: &ControlStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "camlink: {} active | layout: {} | mirror: {} | selected: camera {}",
        status.active_count,
        status.layout,
        if status.mirror { "on" } else { "off" },
        status.selected_camera
    );
    for endpoint in &status.endpoints {
        let slot = endpoint
            .slot
            .map_or_else(|| "-".to_string(), |s| (s + 1).to_string());
        let _ = writeln!(
            out,
            "  [{slot}] {:<16} {:<13} {:<8} rot {}",
            endpoint.endpoint.host(),
            endpoint.state.to_string(),
            if endpoint.online { "online" } else { "offline" },
            endpoint.rotation_degrees
        );
    }
    out.push_str(KEY_HELP);
    out.push('\n');
    out
}

/// Runs the console loop until `q`, end of input, or cancellation.
///
/// `q` cancels `shutdown`, which stops the whole process.  End of input
/// (stdin closed, e.g. when run under a service manager) only stops the
/// console.
pub async fn run_console<R, W>(
    control: ControlUseCase,
    input: R,
    mut output: W,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    write_panel(&mut output, &control).await?;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("console input closed");
            break;
        };

        let mut print_json = false;
        for key in line.chars().filter(|c| !c.is_whitespace()) {
            let Some(command) = ControlCommand::from_key(key) else {
                output
                    .write_all(format!("unknown key '{key}'\n").as_bytes())
                    .await?;
                continue;
            };
            if command == ControlCommand::PrintStatus {
                print_json = true;
            }
            if control.execute(command) == ControlOutcome::Quit {
                output.flush().await?;
                shutdown.cancel();
                return Ok(());
            }
        }

        if print_json {
            match serde_json::to_string_pretty(&control.status()) {
                Ok(json) => {
                    output.write_all(json.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
                Err(e) => warn!("could not serialize status: {e}"),
            }
        }
        write_panel(&mut output, &control).await?;
    }
    output.flush().await
}

async fn write_panel<W>(output: &mut W, control: &ControlUseCase) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let status = control.status();
    if status.show_controls {
        output.write_all(render_panel(&status).as_bytes()).await?;
    }
    output.flush().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
