use crate::{
    models::Notification,
    permissions::{self, Operation},
};
use super::{Caller, Lifecycle, QueryError};

impl Lifecycle {
    /// Get caller's latest notifications and the number of unread ones.
    pub fn notifications(&self, caller: &Caller)
    -> Result<(Vec<Notification>, usize), QueryError> {
        permissions::require(&caller.user, Operation::ViewNotifications)?;
        Ok(Notification::latest(&*self.db, caller.user.id)?)
    }

    /// Mark one of caller's notifications as read.
    ///
    /// Notifications of other users are silently left untouched.
    pub fn mark_read(&self, caller: &Caller, id: uuid::Uuid)
    -> Result<(), QueryError> {
        permissions::require(&caller.user, Operation::ViewNotifications)?;
        Notification::mark_read(&*self.db, caller.user.id, id)?;
        Ok(())
    }

    /// Mark all of caller's notifications as read. Returns the number of
    /// notifications changed.
    pub fn mark_all_read(&self, caller: &Caller) -> Result<usize, QueryError> {
        permissions::require(&caller.user, Operation::ViewNotifications)?;
        Ok(Notification::mark_all_read(&*self.db, caller.user.id)?)
    }
}
