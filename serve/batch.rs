use crate::context::ServingContext;
use crate::encode::RawRecord;
use crate::gateway::{self, Reply};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use serde_json::Value;
use std::io::{self, BufRead, IsTerminal};

/// A progress bar on stderr when it is a terminal, hidden otherwise.
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(len), draw_target);
    if let Ok(style) = ProgressStyle::with_template(
        "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb.set_message(message.to_string());

    pb
}

/// Splits a JSON-lines input into raw lines, dropping blank ones. Lines stay
/// as bytes so a line that is not UTF-8 still gets its own reply.
pub fn read_record_lines<R: BufRead>(input: R) -> io::Result<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    for line in input.split(b'\n') {
        let line = line?;
        let trimmed = line.trim_ascii();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_vec());
        }
    }
    Ok(lines)
}

/// Parses one line of a batch file into a record, or the reply it deserves.
pub fn parse_record_line(line: &[u8]) -> Result<RawRecord, Reply> {
    let text = std::str::from_utf8(line)
        .map_err(|e| Reply::detail(400, format!("Malformed record: {e}")))?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Ok(RawRecord::from(object)),
        Ok(_) => Err(Reply::detail(422, "Record must be a JSON object.")),
        Err(e) => Err(Reply::detail(400, format!("Malformed record: {e}"))),
    }
}

/// Scores every line in parallel. Replies come back in input order, one per
/// line; a bad line yields an error reply without affecting the others.
pub fn score_lines(ctx: &ServingContext, lines: &[Vec<u8>], progress: &ProgressBar) -> Vec<Reply> {
    let replies: Vec<Reply> = lines
        .par_iter()
        .map(|line| {
            let reply = match parse_record_line(line) {
                Ok(record) => gateway::predict_reply(ctx, &record),
                Err(reply) => reply,
            };
            progress.inc(1);
            reply
        })
        .collect();

    let failed = replies.iter().filter(|reply| !reply.is_success()).count();
    progress.finish_with_message(format!("{} scored, {failed} failed", replies.len() - failed));
    log::info!("Batch complete: {} records, {failed} failed", replies.len());
    replies
}
