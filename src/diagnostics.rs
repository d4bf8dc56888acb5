//! Leveled diagnostics for match attempts.
//!
//! A missing target sequence is an expected outcome (a rule written for one
//! host version may simply not apply to another), so it is reported at info
//! level together with a short context identifying the rule that asked.

use crate::ir::Opcode;
use std::fmt;
use std::panic::Location;
use tracing::info;

const UNKNOWN: &str = "<unknown>";

/// Caller-supplied context naming the rule that triggered a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    rule: String,
    caller: String,
}

impl Context {
    /// Context for `rule`, recording the source location of the call.
    #[track_caller]
    pub fn new(rule: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            rule: rule.into(),
            caller: format!("{}:{}", location.file(), location.line()),
        }
    }

    /// Context with an explicit caller description instead of a source location.
    pub fn with_caller(rule: impl Into<String>, caller: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            caller: caller.into(),
        }
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// The two context lines appended to a not-found report.
    pub fn lines(context: Option<&Context>) -> [String; 2] {
        match context {
            Some(ctx) => [format!("rule: {}", ctx.rule), format!("at: {}", ctx.caller)],
            None => [format!("rule: {UNKNOWN}"), format!("at: {UNKNOWN}")],
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.rule, self.caller)
    }
}

/// Which operation failed to find its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Find,
    Patch,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticsReporter {
    verbose: bool,
}

impl DiagnosticsReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// One line per element of a confirmed match window, in verbose mode only.
    pub fn matched_window<I>(&self, start: usize, opcodes: I)
    where
        I: IntoIterator<Item = Opcode>,
    {
        if !self.verbose {
            return;
        }
        for (offset, opcode) in opcodes.into_iter().enumerate() {
            info!("Found {} at {}", opcode, start + offset);
        }
    }

    pub fn not_found(&self, operation: Operation, context: Option<&Context>) {
        info!("{}", not_found_message(operation, context));
    }
}

/// Full text of a not-found report.
pub fn not_found_message(operation: Operation, context: Option<&Context>) -> String {
    let headline = match operation {
        Operation::Patch => {
            "Failed to patch by sequence: couldn't find target sequence.  This might be okay in certain cases."
        }
        Operation::Find => {
            "Couldn't find target sequence.  This might be okay in certain cases."
        }
    };
    let [rule, at] = Context::lines(context);
    format!("{headline}\nContext:\n{rule}\n{at}")
}

/// Log `label` followed by one tab-indented line per item.
pub fn log_sequence<I>(label: &str, sequence: I)
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    info!("{}", format_sequence(label, sequence));
}

pub fn format_sequence<I>(label: &str, sequence: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let mut out = String::from(label);
    for item in sequence {
        out.push_str(&format!("\n\t{item}"));
    }
    out
}

/// Log capture for tests that assert on emitted diagnostics.
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        pub fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `f` with a subscriber that records every event, returning the log text.
    pub fn logs_of<F: FnOnce()>(f: F) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.contents()
    }
}

#[cfg(test)]
mod tests {
    use super::capture::logs_of;
    use super::*;

    #[test]
    fn context_records_call_site() {
        let ctx = Context::new("append-version-string");
        assert_eq!(ctx.rule(), "append-version-string");
        assert!(ctx.caller().starts_with(file!()));
    }

    #[test]
    fn not_found_message_has_two_context_lines() {
        let ctx = Context::with_caller("hook-start", "PLGlobal.Start");
        let msg = not_found_message(Operation::Patch, Some(&ctx));
        let lines: Vec<&str> = msg.lines().collect();

        assert!(lines[0].starts_with("Failed to patch by sequence"));
        assert!(lines[0].contains("This might be okay"));
        assert_eq!(lines[1], "Context:");
        assert_eq!(lines[2], "rule: hook-start");
        assert_eq!(lines[3], "at: PLGlobal.Start");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn not_found_without_context() {
        let msg = not_found_message(Operation::Find, None);
        assert!(msg.starts_with("Couldn't find target sequence."));
        assert!(msg.ends_with("rule: <unknown>\nat: <unknown>"));
    }

    #[test]
    fn not_found_logs_at_info() {
        let logs = logs_of(|| DiagnosticsReporter::new(false).not_found(Operation::Find, None));
        assert!(logs.contains("INFO"));
        assert!(logs.contains("This might be okay in certain cases."));
    }

    #[test]
    fn matched_window_silent_unless_verbose() {
        let quiet = logs_of(|| {
            DiagnosticsReporter::new(false).matched_window(2, [Opcode::Pop, Opcode::Return])
        });
        assert!(quiet.is_empty());

        let loud = logs_of(|| {
            DiagnosticsReporter::new(true).matched_window(2, [Opcode::Pop, Opcode::Return])
        });
        assert!(loud.contains("Found pop at 2"));
        assert!(loud.contains("Found ret at 3"));
    }

    #[test]
    fn sequence_format_one_item_per_line() {
        let text = format_sequence("opcodes:", [Opcode::Nop, Opcode::Return]);
        assert_eq!(text, "opcodes:\n\tnop\n\tret");
    }

    #[test]
    fn log_sequence_emits_label() {
        let logs = logs_of(|| log_sequence("numbers", [1, 2, 3]));
        assert!(logs.contains("numbers"));
        assert!(logs.contains("\t3"));
    }
}
