use tokio::sync::mpsc::UnboundedSender;

/// Display width of the textual progress bar.
pub const PROGRESS_BAR_WIDTH: usize = 40;

/// One-way notification channel for progress text. Sends are best-effort:
/// they never block and never fail the poll, whatever the consumer does.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, message: String);
}

impl ProgressSink for UnboundedSender<String> {
    fn notify(&self, message: String) {
        // A dropped receiver is tolerated silently
        let _ = self.send(message);
    }
}

/// Renders `"<name>: [<hashes><spaces>]<percent>%"` at the given width.
pub fn progress_string(percent: usize, width: usize, name: &str) -> String {
    let left = (width * percent / 100).min(width);
    let right = width - left;
    format!(
        "{}: [{}{}]{}%",
        name,
        "#".repeat(left),
        " ".repeat(right),
        percent
    )
}
