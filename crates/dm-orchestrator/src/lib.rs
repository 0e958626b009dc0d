//! dm-orchestrator: Client-side lifecycle orchestrator for cluster desktops
//!
//! The orchestrator sits between a display layer (CLI, GUI) and the remote
//! job service. It decides whether a desktop may be launched, keeps a polled
//! view of the user's desktops up to date, and runs the confirmed deletion
//! workflow. The remote service is slow and unreliable, so every operation is
//! guarded against overlapping calls and every failure degrades to a
//! notification plus an unchanged view.

pub mod admission;
pub mod client;
pub mod deletion;
pub mod manager;
pub mod notify;
pub mod reconcile;
pub mod state;

pub use admission::LaunchOutcome;
pub use client::HttpJobClient;
pub use deletion::DeleteOutcome;
pub use manager::DesktopManager;
pub use notify::BroadcastNotifier;
pub use reconcile::RefreshStatus;
