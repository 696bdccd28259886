//! Adaptive backward scan of a single mailbox

mod engine;
mod progress;
mod state;
mod window;

pub use engine::{
    DeletionEngine, MailboxReport, ScanStatus, Strategy, choose_strategy, hard_stop,
};
pub use progress::{
    LogProgressSink, ProgressReporter, ProgressSink, ProgressSnapshot, ProgressUpdate,
    interval_elapsed, rate_per_minute,
};
pub use state::{EmptyWindowAction, ScanState};
pub use window::{WindowScanner, Windows};
