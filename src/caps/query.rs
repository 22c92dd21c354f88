//! Active capability query
//!
//! Writes a kitty graphics query followed by a primary device attributes
//! request (DA1) and reads the reply with a deadline. Every terminal answers
//! DA1, so its reply doubles as the end-of-response marker; a terminal that
//! understands the kitty query answers it first.
//!
//! Reference: https://sw.kovidgoyal.net/kitty/graphics-protocol/#querying-support-and-available-transmission-mediums

use std::io::{self, IsTerminal, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::time::{Duration, Instant};

use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use tracing::{debug, trace};

use crate::error::Result;

/// Image id used by the support query; never used for real uploads
pub const KITTY_QUERY_ID: u32 = 31;

/// Kitty 1x1 RGB query, then DA1
pub const CAPABILITY_QUERY: &[u8] = b"\x1b_Gi=31,s=1,v=1,a=q,t=d,f=24;AAAA\x1b\\\x1b[c";

/// Upper bound on the bytes read back from the terminal
const MAX_RESPONSE: usize = 1024;

/// DA1 attribute meaning "sixel graphics"
const DA1_SIXEL: &str = "4";

/// What the terminal told us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryResponse {
    pub kitty_graphics: bool,
    pub sixel_graphics: bool,
    /// A DA1 reply was seen, so the terminal answered in full
    pub complete: bool,
}

/// Pull the DA1 parameter list out of `ESC [ ? ... c`
fn da1_params(response: &str) -> Option<&str> {
    let start = response.find("\x1b[?")? + 3;
    let len = response[start..].find('c')?;
    Some(&response[start..start + len])
}

/// Interpret raw bytes read back after [`CAPABILITY_QUERY`]
pub fn parse_query_response(bytes: &[u8]) -> QueryResponse {
    let text = String::from_utf8_lossy(bytes);
    let kitty_ok = format!("_Gi={};OK", KITTY_QUERY_ID);
    let params = da1_params(&text);
    QueryResponse {
        kitty_graphics: text.contains(&kitty_ok),
        sixel_graphics: params.is_some_and(|p| p.split(';').any(|a| a == DA1_SIXEL)),
        complete: params.is_some(),
    }
}

/// A bidirectional channel to the terminal for capability queries
pub trait QueryChannel {
    /// Send `request` and collect the reply until it is complete or `timeout`
    /// elapses. `Ok(None)` means the terminal is not interactive or stayed
    /// silent.
    fn query(&mut self, request: &[u8], timeout: Duration) -> Result<Option<Vec<u8>>>;
}

/// RAII guard for raw terminal mode on stdin
///
/// The saved attributes are restored on drop, which covers early returns
/// and errors alike.
pub struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    pub fn new() -> Result<Self> {
        let original = termios::tcgetattr(io::stdin())?;

        let mut raw = original.clone();

        // Disable canonical mode and echo
        raw.local_flags.remove(LocalFlags::ICANON);
        raw.local_flags.remove(LocalFlags::ECHO);
        raw.local_flags.remove(LocalFlags::IEXTEN);

        // Reads return whatever is available; poll() does the waiting
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &raw)?;

        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.original);
    }
}

/// Query channel over the controlling terminal (stdin/stdout)
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyChannel;

impl TtyChannel {
    fn read_until_complete(deadline: Instant) -> Result<Vec<u8>> {
        let stdin = io::stdin();
        let fd = stdin.as_fd();
        let mut response = Vec::new();
        let mut buf = [0u8; 256];

        while response.len() < MAX_RESPONSE {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
            let timeout_ms = remaining.as_millis().clamp(1, i32::MAX as u128) as i32;
            let ready = poll(&mut fds, timeout_ms)?;
            let readable = ready > 0
                && fds[0]
                    .revents()
                    .is_some_and(|r| r.contains(PollFlags::POLLIN));
            if !readable {
                break;
            }

            let n = nix::unistd::read(fd.as_raw_fd(), &mut buf)?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&buf[..n]);
            if parse_query_response(&response).complete {
                break;
            }
        }
        Ok(response)
    }
}

impl QueryChannel for TtyChannel {
    fn query(&mut self, request: &[u8], timeout: Duration) -> Result<Option<Vec<u8>>> {
        if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
            debug!("stdin/stdout is not a terminal, skipping capability query");
            return Ok(None);
        }

        let deadline = Instant::now() + timeout;
        let _guard = RawModeGuard::new()?;

        let mut stdout = io::stdout().lock();
        stdout.write_all(request)?;
        stdout.flush()?;
        drop(stdout);

        let response = Self::read_until_complete(deadline)?;
        trace!(bytes = response.len(), "capability query response");
        if response.is_empty() {
            Ok(None)
        } else {
            Ok(Some(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kitty_and_da1() {
        let reply = b"\x1b_Gi=31;OK\x1b\\\x1b[?62;4;22c";
        let parsed = parse_query_response(reply);
        assert!(parsed.kitty_graphics);
        assert!(parsed.sixel_graphics);
        assert!(parsed.complete);
    }

    #[test]
    fn test_parse_da1_without_sixel() {
        let parsed = parse_query_response(b"\x1b[?1;2c");
        assert!(!parsed.kitty_graphics);
        assert!(!parsed.sixel_graphics);
        assert!(parsed.complete);
    }

    #[test]
    fn test_parse_attribute_is_exact_match() {
        // 42 is not 4
        let parsed = parse_query_response(b"\x1b[?62;42c");
        assert!(!parsed.sixel_graphics);
    }

    #[test]
    fn test_parse_kitty_error_reply() {
        let parsed = parse_query_response(b"\x1b_Gi=31;ENOTSUPPORTED\x1b\\");
        assert!(!parsed.kitty_graphics);
        assert!(!parsed.complete);
    }

    #[test]
    fn test_parse_partial() {
        let parsed = parse_query_response(b"\x1b[?62;4");
        assert_eq!(parsed, QueryResponse::default());
    }

    #[test]
    fn test_query_contains_both_requests() {
        let q = String::from_utf8_lossy(CAPABILITY_QUERY);
        assert!(q.starts_with("\x1b_G"));
        assert!(q.contains("a=q"));
        assert!(q.ends_with("\x1b[c"));
    }
}
