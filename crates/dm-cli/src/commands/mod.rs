//! CLI command implementations

mod config;
mod configs;
mod launch;
mod list;
mod signout;
mod stop;
mod watch;

pub use config::{config_get, config_init, config_path, config_set, config_show};
pub use configs::configs_command;
pub use launch::{launch_command, LaunchOverrides};
pub use list::list_command;
pub use signout::signout_command;
pub use stop::{stop_command, StdinConfirm};
pub use watch::watch_command;

use tokio::sync::broadcast;

use crate::output::{print_info, print_warning};

/// Print every notification queued on `rx` and return them
pub(crate) fn print_notifications(rx: &mut broadcast::Receiver<String>) -> Vec<String> {
    let mut printed = Vec::new();
    while let Ok(message) = rx.try_recv() {
        print_notification(&message);
        printed.push(message);
    }
    printed
}

pub(crate) fn print_notification(message: &str) {
    if message.contains("failed") || message.starts_with("Could not") {
        print_warning(message);
    } else {
        print_info(message);
    }
}
