//! Handling of events and notifications.
//!
//! Notifications are fire-and-forget: a failure to deliver one is logged by
//! [`notify`] and never reported to the operation which caused it.

use chrono::Utc;
use failure::Fail;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{DbError, Storage, models as db};

mod events;
mod service;

pub use self::{
    events::Event,
    service::{
        EventManager,
        NewEvent,
        Notify,
        RegisterListener,
        UnregisterListener,
    },
};

/// Notification-delivery collaborator.
pub trait Notifier: Send + Sync {
    /// Send a notification of an event to a user.
    fn send(&self, user: Uuid, event: Event) -> Result<(), NotifyError>;
}

/// Notify a user of an event.
///
/// Errors will be logged, but otherwise ignored.
pub fn notify(notifier: &dyn Notifier, user: Uuid, event: Event) {
    let kind = event.kind();

    match notifier.send(user, event) {
        Ok(()) => debug!("Notified {} of {}", user, kind),
        Err(err) => error!("Could not notify {} of {}: {}", user, kind, err),
    }
}

/// Persist a notification of an event.
pub(crate) fn store(db: &dyn Storage, user: Uuid, event: &Event)
-> Result<db::Notification, DbError> {
    let notification = db::Notification {
        id: Uuid::new_v4(),
        user,
        kind: event.kind().to_string(),
        title: event.title().to_string(),
        message: event.message(),
        severity: event.severity(),
        is_unread: true,
        timestamp: Utc::now(),
    };

    db.insert_notification(notification.clone())?;

    Ok(notification)
}

/// Notifier persisting notifications directly, without an actor.
#[derive(Clone)]
pub struct StoreNotifier {
    db: Arc<dyn Storage>,
}

impl StoreNotifier {
    pub fn new(db: Arc<dyn Storage>) -> StoreNotifier {
        StoreNotifier { db }
    }
}

impl Notifier for StoreNotifier {
    fn send(&self, user: Uuid, event: Event) -> Result<(), NotifyError> {
        store(&*self.db, user, &event)?;
        Ok(())
    }
}

#[derive(Debug, Fail)]
pub enum NotifyError {
    #[fail(display = "Database error: {}", _0)]
    Database(#[cause] DbError),
    /// The event manager could not accept the message.
    #[fail(display = "Could not dispatch notification: {}", _0)]
    Dispatch(String),
}

impl_from! { for NotifyError ;
    DbError => |e| NotifyError::Database(e),
}
