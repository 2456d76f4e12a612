//! Actix actor handling persistence and delivery of notifications.

use actix::{Actor, Addr, Context, Handler, Message, Recipient};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::db::Storage;
use super::{Event, Notifier, NotifyError};

/// Notify a user of an event.
///
/// After receiving this message the event manager will persist `event`, and
/// forward it to the user's listener, if one is registered.
pub struct Notify {
    pub user: Uuid,
    pub event: Event,
}

impl Message for Notify {
    type Result = ();
}

/// Message sent to a registered listener when a new notification is created.
///
/// To register for receiving this message send [`RegisterListener`]
/// to [`EventManager`].
#[derive(Clone, Debug)]
pub struct NewEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl Message for NewEvent {
    type Result = ();
}

/// Register a new event listener for a given user.
pub struct RegisterListener {
    pub user: Uuid,
    pub addr: Recipient<NewEvent>,
}

impl Message for RegisterListener {
    type Result = ();
}

/// Unregister an event listener for a given user.
pub struct UnregisterListener {
    pub user: Uuid,
}

impl Message for UnregisterListener {
    type Result = ();
}

/// Actix actor which manages persisting notifications and forwarding them to
/// listeners.
pub struct EventManager {
    db: Arc<dyn Storage>,
    streams: HashMap<Uuid, Recipient<NewEvent>>,
}

impl EventManager {
    pub fn new(db: Arc<dyn Storage>) -> EventManager {
        EventManager {
            db,
            streams: HashMap::new(),
        }
    }

    fn do_notify(&mut self, msg: Notify) -> Result<(), NotifyError> {
        let Notify { user, event } = msg;

        let notification = super::store(&*self.db, user, &event)?;

        if let Some(stream) = self.streams.get(&user) {
            stream.do_send(NewEvent {
                id: notification.id,
                timestamp: notification.timestamp,
                event,
            });
        }

        Ok(())
    }
}

impl Actor for EventManager {
    type Context = Context<Self>;
}

impl Handler<Notify> for EventManager {
    type Result = ();

    fn handle(&mut self, msg: Notify, _: &mut Context<Self>) {
        if let Err(err) = self.do_notify(msg) {
            error!("Error persisting notification: {}", err);
        }
    }
}

impl Handler<RegisterListener> for EventManager {
    type Result = ();

    fn handle(&mut self, msg: RegisterListener, _: &mut Self::Context) {
        let RegisterListener { user, addr } = msg;
        self.streams.insert(user, addr);
    }
}

impl Handler<UnregisterListener> for EventManager {
    type Result = ();

    fn handle(&mut self, msg: UnregisterListener, _: &mut Self::Context) {
        self.streams.remove(&msg.user);
    }
}

/// Sending through an address only enqueues the notification; it is
/// persisted asynchronously by the manager.
impl Notifier for Addr<EventManager> {
    fn send(&self, user: Uuid, event: Event) -> Result<(), NotifyError> {
        self.try_send(Notify { user, event })
            .map_err(|err| NotifyError::Dispatch(err.to_string()))
    }
}
