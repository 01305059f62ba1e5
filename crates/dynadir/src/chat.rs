//! TCP chat collaborator: wire framing for the chat connection.
//!
//! No task is spawned per connection: the event loop holds at most one chat
//! peer socket at a time and multiplexes it directly alongside the directory
//! socket, matching the single-threaded cooperative scheduling the rest of
//! this crate follows. A second inbound connection while one is already open
//! is rejected inline with a busy frame and dropped.

use dynadir_core::types::FullName;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::warn;

/// Sent to a second caller while a chat peer is already connected.
const BUSY_MESSAGE: &str = "Sorry, I am busy right now.";

/// Printed by the `rickroll` command.
pub const RICKROLL_TEXT: &str =
    "Never gonna give you up, never gonna let you down, never gonna run around and desert you.";

/// Formats a framed chat message: `MSS name.surname;text\n`.
pub fn format_frame(sender: &FullName, text: &str) -> String {
    format!("MSS {sender};{text}\n")
}

/// Formats a raw (unframed) send — `mraw` bypasses the `MSS` wrapper
/// entirely so the remote sees exactly what was typed.
pub fn format_raw(text: &str) -> String {
    let mut s = text.to_string();
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

/// Writes the busy frame to `stream` and lets it drop, closing the
/// connection — the response to a second inbound caller while one chat
/// peer is already connected.
pub async fn reject_busy(mut stream: TcpStream, my_name: &FullName) {
    let frame = format_frame(my_name, BUSY_MESSAGE);
    if let Err(e) = stream.write_all(frame.as_bytes()).await {
        warn!(error = %e, "failed writing busy rejection, dropping connection anyway");
    }
}

/// Pulls every complete newline-terminated line out of `buf`, reformatting
/// `MSS name.surname;text` frames as `name.surname: text` for display and
/// passing anything else through unframed (raw sends). Leaves a trailing
/// partial line in `buf` for the next read.
pub fn drain_frames(buf: &mut String) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(nl) = buf.find('\n') {
        let line = buf[..nl].trim_end_matches('\r').to_string();
        buf.drain(..=nl);
        if let Some(rest) = line.strip_prefix("MSS ") {
            match rest.split_once(';') {
                Some((name, text)) => out.push(format!("{name}: {text}")),
                None => {
                    warn!(line = %rest, "malformed MSS frame, displaying raw");
                    out.push(line);
                }
            }
        } else if !line.is_empty() {
            out.push(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FullName {
        FullName::new(s).unwrap()
    }

    #[test]
    fn format_frame_matches_wire_shape() {
        assert_eq!(
            format_frame(&name("alice.stark"), "hello"),
            "MSS alice.stark;hello\n"
        );
    }

    #[test]
    fn drain_frames_reformats_mss_lines() {
        let mut buf = String::from("MSS alice.stark;hello\nMSS bob.stark;hi there\n");
        let lines = drain_frames(&mut buf);
        assert_eq!(lines, vec!["alice.stark: hello", "bob.stark: hi there"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_frames_leaves_partial_line_buffered() {
        let mut buf = String::from("MSS alice.stark;hel");
        let lines = drain_frames(&mut buf);
        assert!(lines.is_empty());
        assert_eq!(buf, "MSS alice.stark;hel");
    }

    #[test]
    fn drain_frames_passes_through_raw_sends() {
        let mut buf = String::from("just some raw text\n");
        let lines = drain_frames(&mut buf);
        assert_eq!(lines, vec!["just some raw text"]);
    }
}
