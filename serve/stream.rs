use crate::context::ServingContext;
use crate::gateway::{self, Reply, Request};
use std::io::{self, BufRead, Write};

/// Counts reported when the request loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub handled: usize,
    pub failed: usize,
}

/// Answers newline-delimited JSON requests until `input` is exhausted.
///
/// Each non-blank line must be a UTF-8 `Request`; each produces exactly one
/// `Reply` line on `output`, flushed immediately. A line that is not UTF-8 or
/// does not parse gets a 400 reply and the loop carries on. Only I/O failures
/// end the loop early.
pub fn serve_lines<R: BufRead, W: Write>(
    ctx: &ServingContext,
    mut input: R,
    mut output: W,
) -> io::Result<ServeSummary> {
    let mut summary = ServeSummary::default();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if input.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        let line = buffer.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let reply = match std::str::from_utf8(line) {
            Ok(text) => match serde_json::from_str::<Request>(text) {
                Ok(request) => {
                    log::debug!("{:?} {}", request.method, request.path);
                    gateway::handle(ctx, &request)
                }
                Err(e) => Reply::detail(400, format!("Malformed request: {e}")),
            },
            Err(e) => Reply::detail(400, format!("Malformed request: {e}")),
        };

        summary.handled += 1;
        if !reply.is_success() {
            summary.failed += 1;
        }

        serde_json::to_writer(&mut output, &reply)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    log::info!(
        "Request stream closed after {} requests ({} failed)",
        summary.handled,
        summary.failed
    );
    Ok(summary)
}
