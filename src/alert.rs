//! User-facing notifications.
//!
//! Fatal setup problems are shown in a blocking message dialog before the
//! process exits; everything recoverable goes through the logger and never
//! interrupts rendering.

use rfd::{MessageDialog, MessageLevel};

/// Show a blocking error dialog, then terminate the process.
///
/// Used for unrecoverable setup failures (context creation, shader
/// compilation, render-target validation, scene import). The dialog must be
/// dismissed before the process exits with a nonzero status.
pub fn fatal(title: &str, message: &str) -> ! {
    log::error!("{}: {}", title, message);
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .show();
    std::process::exit(1);
}

/// Report a non-fatal problem.
///
/// Logged only; rendering continues, possibly with a visually incomplete
/// scene.
pub fn warn(title: &str, message: &str) {
    log::warn!("{}: {}", title, message);
}
