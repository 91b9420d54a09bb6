//! # AXON Timer
//!
//! One-shot deferred notifications that stay correct when a timer object is
//! canceled and re-armed while an expiry for the old arming is in flight.
//!
//! # Protocol
//!
//! ```text
//!            arm()                 authority expire(token) == current
//!   Idle ───────────► Armed ───────────────────────────────────► Expired
//!    ▲                  │                                          │
//!    │                  │ cancel()                                 │
//!    │                  ▼                                          │
//!    └──── arm() ── Canceled ◄─────────────────────── arm() ───────┘
//! ```
//!
//! Every arming receives a fresh [`TimerToken`] from the [`TimerAuthority`].
//! Only the authority can expire a timer, and only by presenting the token
//! of the arming that is current. An expiry carrying a token from an older
//! arming is rejected with [`TimerError::SecurityViolation`] and never fires
//! the new arming's target.
//!
//! # Module Structure
//!
//! - [`authority`] - Token issuing, pending set and expiry polling
//! - [`timer`] - The re-armable timer
//! - [`event`] - Notification targets
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod authority;
pub mod error;
pub mod event;
pub mod timer;

pub use crate::authority::{POLL_TASK_NAME, TimerAuthority, TimerToken};
pub use crate::error::TimerError;
pub use crate::event::{Event, EventState, TimerNotify, TimerOutcome};
pub use crate::timer::Timer;
