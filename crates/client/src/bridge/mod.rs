//! Notification, sync and control entry points.
//!
//! These handlers sit at the boundary: they decode inbound events and hand
//! the work to the platform capabilities (`Notifier`, `ClientPages`) or to
//! the external `SyncCollaborator`. Nothing here owns durable state.

pub mod click;
pub mod clients;
pub mod control;
pub mod push;
pub mod sync;

pub use click::{ClickOutcome, NotificationClick, handle_click, resolve_click};
pub use clients::{ClientPage, ClientPages, ClientRegistry};
pub use control::{ControlMessage, clear_all_tiers};
pub use push::{Notification, NotificationAction, NotificationProfile, Notifier, PushPayload, handle_push};
pub use sync::{LoggingOutbox, SyncCollaborator, SyncTag};
