use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Show a spinner with elapsed time while `work` runs on the network, then
/// clear it so the result prints on a clean line.
pub async fn with_spinner<T>(message: String, work: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}") {
        spinner.set_style(style.tick_chars("◐◓◑◒ "));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = work.await;
    spinner.finish_and_clear();
    result
}
