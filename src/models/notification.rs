use uuid::Uuid;

use crate::db::{DbError, Storage, models as db};

/// Number of notifications returned by [`Notification::latest`].
pub const LIST_LIMIT: usize = 50;

/// A message delivered to a user.
#[derive(Clone, Debug)]
pub struct Notification {
    data: db::Notification,
}

impl Notification {
    /// Construct `Notification` from its database counterpart.
    pub(crate) fn from_db(data: db::Notification) -> Notification {
        Notification { data }
    }

    /// Unpack database data.
    pub fn into_db(self) -> db::Notification {
        self.data
    }

    /// Get a user's most recent notifications, together with the number of
    /// all their unread notifications.
    pub fn latest(db: &dyn Storage, user: Uuid)
    -> Result<(Vec<Notification>, usize), DbError> {
        let unread = db.notifications(user, usize::max_value())?
            .iter()
            .filter(|n| n.is_unread)
            .count();
        let list = db.notifications(user, LIST_LIMIT)?
            .into_iter()
            .map(Notification::from_db)
            .collect();

        Ok((list, unread))
    }

    /// Mark one of user's notifications as read.
    pub fn mark_read(db: &dyn Storage, user: Uuid, id: Uuid)
    -> Result<usize, DbError> {
        db.mark_notifications_read(user, Some(id))
    }

    /// Mark all of user's notifications as read.
    pub fn mark_all_read(db: &dyn Storage, user: Uuid)
    -> Result<usize, DbError> {
        db.mark_notifications_read(user, None)
    }
}

impl std::ops::Deref for Notification {
    type Target = db::Notification;

    fn deref(&self) -> &db::Notification {
        &self.data
    }
}
