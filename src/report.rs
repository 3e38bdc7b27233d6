//! Context-stack error reports.
//!
//! A [`Report`] carries a root cause plus the context added by each layer it
//! passes through on its way to the command handler. It never allocates:
//! every context is trimmed to [`MAX_CONTEXT_LEN`] bytes, and once
//! [`MAX_CONTEXTS`] entries are held the middle of the stack is dropped so
//! that both the root cause and the most recent context survive.
//!
//! A report ends its life in [`Report::build_message`], which consumes it.
//!
//! ```rust
//! use throttle_stand::report::Report;
//!
//! let msg = Report::from_cause("valid trace not loaded")
//!     .context("invalid fuel trace")
//!     .build_message();
//! assert_eq!(msg.as_str(), "valid trace not loaded: invalid fuel trace");
//! ```

use core::fmt::{self, Display, Write};

use heapless::{Deque, String, Vec};

use crate::error::Error;

/// Number of context entries a report holds.
pub const MAX_CONTEXTS: usize = 6;

/// Entries kept from the root side when the middle of the stack is dropped.
pub const MAX_DEEP_CONTEXTS: usize = MAX_CONTEXTS / 2;

/// Byte cap of one context entry.
pub const MAX_CONTEXT_LEN: usize = 75;

/// Placeholder inside an over-long context entry.
pub const LONG_CONTEXT_ELISION: &str = " [...] ";

/// Placeholder where middle entries were dropped.
pub const ELIDED_CONTEXTS: &str = "[elided context]";

/// Separator between entries in the rendered message.
pub const CONTEXT_SEPARATOR: &str = ": ";

/// Largest possible rendered message.
pub const MAX_ERROR_MESSAGE_LEN: usize = MAX_CONTEXTS * MAX_CONTEXT_LEN
    + ELIDED_CONTEXTS.len()
    + CONTEXT_SEPARATOR.len() * MAX_CONTEXTS;

const LEFT_BYTES: usize = (MAX_CONTEXT_LEN - LONG_CONTEXT_ELISION.len()) / 2;
const RIGHT_BYTES: usize = MAX_CONTEXT_LEN - LONG_CONTEXT_ELISION.len() - LEFT_BYTES;

/// Rendered report, sized for the response field of the command transport.
pub type ErrorMessage = String<MAX_ERROR_MESSAGE_LEN>;

type Context = String<MAX_CONTEXT_LEN>;

/// An error on its way to the command handler.
#[must_use = "a report must be turned into a message with `build_message`"]
#[derive(Debug)]
pub struct Report {
    contexts: Vec<Context, MAX_CONTEXTS>,
    elided: bool,
    built: bool,
}

impl Report {
    /// Start a report from its root cause.
    pub fn from_cause(cause: impl Display) -> Self {
        let mut contexts = Vec::new();
        let _ = contexts.push(trim_context(&cause));
        Self {
            contexts,
            elided: false,
            built: false,
        }
    }

    /// Start a report from a negative OS-style error code.
    pub fn from_code(code: i32) -> Self {
        Self::from_cause(format_args!(
            "{} (err code {})",
            strerror(code.unsigned_abs()),
            code
        ))
    }

    /// Add a context entry on top of the stack.
    pub fn context(mut self, context: impl Display) -> Self {
        if self.contexts.is_full() {
            self.contexts.remove(MAX_DEEP_CONTEXTS);
            self.elided = true;
        }
        let _ = self.contexts.push(trim_context(&context));
        self
    }

    /// The root cause, as trimmed.
    pub fn root_cause(&self) -> &str {
        self.contexts.first().map(|c| c.as_str()).unwrap_or("")
    }

    /// Render the report, root cause first, and consume it.
    pub fn build_message(mut self) -> ErrorMessage {
        let mut message = ErrorMessage::new();
        let used = self.contexts.len();
        for (i, ctx) in self.contexts.iter().enumerate() {
            let _ = message.push_str(ctx);
            if i != used - 1 {
                let _ = message.push_str(CONTEXT_SEPARATOR);
            }
            if self.elided && i == MAX_DEEP_CONTEXTS - 1 {
                let _ = message.push_str(ELIDED_CONTEXTS);
                let _ = message.push_str(CONTEXT_SEPARATOR);
            }
        }
        self.built = true;
        message
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        if !self.built {
            error!(
                "error report dropped without being built: {=str}",
                self.root_cause()
            );
        }
    }
}

impl<E: Into<Error>> From<E> for Report {
    fn from(e: E) -> Self {
        Report::from_cause(e.into())
    }
}

/// Attach context to the error of a `Result` while propagating it.
pub trait ResultExt<T> {
    /// Convert the error into a [`Report`] and push `context` onto it.
    fn context(self, context: impl Display) -> Result<T, Report>;
}

impl<T, E: Into<Report>> ResultExt<T> for Result<T, E> {
    fn context(self, context: impl Display) -> Result<T, Report> {
        self.map_err(|e| e.into().context(context))
    }
}

/// Formats into a fixed context slot, keeping the head and the tail of
/// over-long text.
struct Trimmer {
    head: Context,
    tail: Deque<u8, RIGHT_BYTES>,
    total: usize,
}

impl Write for Trimmer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.head.push(c).is_err() {
                break;
            }
        }
        for b in s.bytes() {
            if self.tail.is_full() {
                self.tail.pop_front();
            }
            let _ = self.tail.push_back(b);
        }
        self.total += s.len();
        Ok(())
    }
}

fn trim_context(raw: &dyn Display) -> Context {
    let mut t = Trimmer {
        head: Context::new(),
        tail: Deque::new(),
        total: 0,
    };
    let _ = write!(t, "{}", raw);

    if t.total <= MAX_CONTEXT_LEN {
        return t.head;
    }

    let mut cut = LEFT_BYTES.min(t.head.len());
    while !t.head.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut right = [0u8; RIGHT_BYTES];
    let mut n = 0;
    for b in t.tail.iter().copied().skip_while(|b| b & 0xC0 == 0x80) {
        right[n] = b;
        n += 1;
    }

    let mut trimmed = Context::new();
    let _ = trimmed.push_str(&t.head[..cut]);
    let _ = trimmed.push_str(LONG_CONTEXT_ELISION);
    if let Ok(tail) = core::str::from_utf8(&right[..n]) {
        let _ = trimmed.push_str(tail);
    }
    trimmed
}

fn strerror(errno: u32) -> &'static str {
    match errno {
        1 => "Not owner",
        5 => "I/O error",
        11 => "No more contexts",
        12 => "Not enough core",
        16 => "Device or resource busy",
        19 => "No such device",
        22 => "Invalid argument",
        116 => "Connection timed out",
        134 => "Unsupported value",
        _ => "Unknown error",
    }
}
