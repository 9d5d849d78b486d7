//! # rentix-notify: Booking Notifications
//!
//! Sends WhatsApp messages for booking events recorded in the outbox.
//!
//! ## Module Organization
//!
//! - [`config`] - `NotifyConfig` from TOML file and `RENTIX_*` environment
//! - [`sender`] - `NotificationSender` trait, `WhatsAppSender`, `RecordingSender`
//! - [`template`] - Message text per event
//! - [`dispatcher`] - `EventDispatcher` draining the outbox
//! - [`error`] - Notification error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rentix_notify::{EventDispatcher, NotifyConfig, WhatsAppSender};
//!
//! let config = Arc::new(NotifyConfig::load(None)?);
//! let sender = Arc::new(WhatsAppSender::new(&config.whatsapp)?);
//! let (task, handle) = EventDispatcher::new(db, sender, config).spawn();
//! // ...
//! handle.shutdown().await;
//! task.await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod sender;
pub mod template;

pub use config::{DispatchSettings, NotifyConfig, WhatsAppSettings};
pub use dispatcher::{DispatchReport, DispatcherHandle, EventDispatcher};
pub use error::{NotifyError, NotifyResult};
pub use sender::{NotificationSender, RecordingSender, WhatsAppSender};
