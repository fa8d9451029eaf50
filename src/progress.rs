//! Append-only campaign progress sink.
//!
//! One timestamped record per completed action and one per completed
//! identity. Write-only: nothing in the engine reads these records back.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::executor::ActionOutcome;
use crate::runner::IdentityReport;

pub struct ProgressLog {
    sink: Box<dyn Write + Send>,
}

impl ProgressLog {
    /// Open (or create) a file-backed log in append mode.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn from_writer(sink: Box<dyn Write + Send>) -> Self {
        Self { sink }
    }

    pub fn record_action(&mut self, handle: &str, outcome: &ActionOutcome) -> io::Result<()> {
        let verdict = if outcome.succeeded { "ok" } else { "failed" };
        write!(
            self.sink,
            "{} action {} {} {} attempts={}",
            timestamp(),
            handle,
            outcome.action,
            verdict,
            outcome.attempts
        )?;
        if let Some(failure) = outcome.failure {
            write!(self.sink, " failure={failure}")?;
        }
        if let Some(ref message) = outcome.server_message {
            write!(self.sink, " message={message:?}")?;
        }
        writeln!(self.sink)?;
        self.sink.flush()
    }

    pub fn record_identity(&mut self, report: &IdentityReport) -> io::Result<()> {
        writeln!(
            self.sink,
            "{} identity {} done {}/{} actions ok",
            timestamp(),
            report.handle,
            report.succeeded_count(),
            report.outcomes.len()
        )?;
        self.sink.flush()
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::executor::ActionKind;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn action_records_carry_verdict_and_attempts() {
        let buffer = SharedBuffer::default();
        let mut log = ProgressLog::from_writer(Box::new(buffer.clone()));

        log.record_action(
            "@alice",
            &ActionOutcome {
                action: ActionKind::FollowTwitter,
                succeeded: true,
                server_message: Some("followed".into()),
                failure: None,
                attempts: 2,
            },
        )
        .unwrap();

        let line = buffer.contents();
        assert!(line.contains("action @alice followTwitter ok attempts=2"));
        assert!(line.contains(r#"message="followed""#));
    }

    #[test]
    fn failed_actions_record_failure_kind() {
        let buffer = SharedBuffer::default();
        let mut log = ProgressLog::from_writer(Box::new(buffer.clone()));

        log.record_action(
            "@bob",
            &ActionOutcome {
                action: ActionKind::PostTwitter,
                succeeded: false,
                server_message: None,
                failure: Some(crate::classify::FailureKind::BotProtection),
                attempts: 3,
            },
        )
        .unwrap();

        assert!(buffer.contents().contains("failure=bot_protection_block"));
    }
}
