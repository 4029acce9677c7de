use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use twitter::Reporter;

/// Terminal spinner showing the latest status line
pub struct Spinner(ProgressBar);

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self(pb)
    }

    pub fn succeed(self, message: &str) {
        self.0.finish_with_message(message.to_string());
    }

    pub fn fail(self) {
        self.0.abandon();
    }
}

impl Reporter for Spinner {
    fn status(&self, message: &str) {
        self.0.set_message(message.to_string());
    }
}
