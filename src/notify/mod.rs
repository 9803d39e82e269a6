pub(crate) mod email;

use std::path::Path;

use crate::backup::RunStamp;
use crate::errors::Result;

pub use email::SmtpNotifier;

/// The message sent at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub html_body: String,
}

impl Report {
    pub fn compose(stamp: &RunStamp, exit_code: u8, log_text: &str, backup_dir: &Path, log_path: &Path) -> Self {
        let subject = if exit_code == 0 {
            format!("Backup MySQL Log: {}", stamp)
        } else {
            format!("*** ERRORS: Backup MySQL Log *** on {}", stamp)
        };

        let html_body = format!(
            "<pre>{}</pre><p>Files backed up to <b>{}</b></p><p>Log file at <b>{}</b></p>",
            escape_html(log_text),
            escape_html(&backup_dir.display().to_string()),
            escape_html(&log_path.display().to_string()),
        );

        Report { subject, html_body }
    }
}

/// Delivers the end-of-run report. Delivery is best effort: the runner logs
/// failures and never lets them change the exit status.
pub trait Notifier {
    async fn notify(&self, report: &Report) -> Result<()>;
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
