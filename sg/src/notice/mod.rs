//! Notices the coordinator raises outside of explicit user actions
//!
//! Consumers use them to show one-time explanations ("your account has no
//! profile", "admin access denied"). Only reason codes and messages leave the
//! coordinator, never raw error values.

mod bus;
mod types;

pub use bus::{DEFAULT_NOTICE_CAPACITY, NoticeBus};
pub use types::{RecoveryReason, SessionNotice};

/// Callback invoked with every notice a coordinator raises
pub trait RecoveryNotifier: Send + Sync {
    fn notify(&self, notice: SessionNotice);
}

impl<F> RecoveryNotifier for F
where
    F: Fn(SessionNotice) + Send + Sync,
{
    fn notify(&self, notice: SessionNotice) {
        self(notice)
    }
}

/// Notifier that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl RecoveryNotifier for NullNotifier {
    fn notify(&self, _notice: SessionNotice) {}
}
