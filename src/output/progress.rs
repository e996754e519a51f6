use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failure, notice, success};

/// Spinner shown on stderr while a fetch is in flight
pub struct FetchProgress {
    pb: ProgressBar,
    what: &'static str,
}

impl FetchProgress {
    pub fn start(what: &'static str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
            pb.set_style(style);
        }
        pb.set_message(notice(format!("Fetching {what}")).to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb, what }
    }

    pub fn finish<T, E>(self, result: &Result<Vec<T>, E>) {
        let message = match result {
            Ok(items) => success(format!("Fetched {} {} ✓", items.len(), self.what)),
            Err(_) => failure(format!("Failed to fetch {} ✗", self.what)),
        };
        self.pb.finish_with_message(message.to_string());
    }

    pub fn complete(self) {
        self.pb
            .finish_with_message(success(format!("Fetched {} ✓", self.what)).to_string());
    }
}
