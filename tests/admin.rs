//! Tests for user administration, statistics, notifications and the audit
//! log.

use failure::Fallible;
use scriptorium::{
    db::types::{Amount, PaymentStatus, Role},
    error::{ApiError, StatusCode},
    lifecycle::{Caller, ManageUserError},
    models::{NewPayment, NewUser, User, UserUpdate},
};

mod common;

use self::common::{Harness, run_test};

#[test]
fn create_and_update_users() {
    run_test(|h: Harness| -> Fallible<()> {
        let user = h.lifecycle.create_user(&h.admin,
            NewUser::new("Dev Patel", "dev@cspg.test", Role::Reviewer))?;
        assert!(h.lifecycle.reviewers(&h.editor)?.iter().any(|r| r.id == user.id));

        match h.lifecycle.create_user(&h.editor,
            NewUser::new("Dev", "DEV@cspg.test", Role::Author))
        {
            Err(ManageUserError::Create(_)) => (),
            r => panic!("unexpected result: {:?}", r.map(|u| u.id)),
        }

        let err = h.lifecycle.create_user(&h.author,
            NewUser::new("Eve", "eve@cspg.test", Role::Admin)).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let updated = h.lifecycle.update_user(&h.admin, user.id, UserUpdate {
            role: Some(Role::Editor),
            institution: Some("IISc".to_string()),
            ..UserUpdate::default()
        })?;
        assert_eq!(updated.role, Role::Editor);
        assert_eq!(User::by_id(&*h.db, user.id)?.institution.as_ref().unwrap(),
            "IISc");

        let err = h.lifecycle.update_user(&h.admin, user.id, UserUpdate {
            email: Some("author@cspg.test".to_string()),
            ..UserUpdate::default()
        }).unwrap_err();
        match err {
            ManageUserError::Duplicate => (),
            ref e => panic!("unexpected error: {:?}", e),
        }

        assert_eq!(h.lifecycle.users(&h.admin)?.len(), 7);

        Ok(())
    })
}

#[test]
fn disabled_portal_refuses_operations() {
    run_test(|h: Harness| -> Fallible<()> {
        h.lifecycle.set_portal_access(&h.admin, h.author.user.id, false,
            Some("Outstanding fees".to_string()))?;

        let author = Caller::load(&*h.db, h.author.user.id,
            Default::default())?;
        let err = h.lifecycle.my_submissions(&author).unwrap_err();
        assert_eq!(err.code().unwrap(), "user:portal-disabled");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        h.lifecycle.set_portal_access(&h.admin, h.author.user.id, true, None)?;
        let author = Caller::load(&*h.db, h.author.user.id,
            Default::default())?;
        assert!(h.lifecycle.my_submissions(&author)?.is_empty());

        let actions = h.lifecycle.audit_log(&h.admin, Some("portal"), 1, None)?
            .entries
            .into_iter()
            .map(|e| e.action)
            .collect::<Vec<_>>();
        assert_eq!(actions, vec!["PORTAL_ENABLED", "PORTAL_DISABLED"]);

        Ok(())
    })
}

#[test]
fn statistics() {
    run_test(|h: Harness| -> Fallible<()> {
        let first = h.submit("First");
        let second = h.submit("Second");
        h.submit("Third");

        h.lifecycle.update_status(&h.editor, first.id, "under_review", None)?;
        h.lifecycle.update_status(&h.editor, second.id, "accepted", None)?;

        let (payment, _) = h.lifecycle.create_payment(&h.author, second.id,
            NewPayment {
                amount: "2000.50".parse::<Amount>()?,
                method: "UPI".to_string(),
                transaction_id: "UPI-1".to_string(),
            })?;

        let stats = h.lifecycle.stats(&h.editor)?;
        assert_eq!(stats.total_submissions, 3);
        assert_eq!(stats.under_review, 1);
        assert_eq!(stats.accepted, 0);
        assert_eq!(stats.pending_fee, 1);
        assert_eq!(stats.total_users, 6);
        assert!(stats.fee_collected.is_zero());

        h.lifecycle.verify_payment(&h.editor, payment.id,
            PaymentStatus::Completed, None)?;

        let stats = h.lifecycle.stats(&h.admin)?;
        assert_eq!(stats.pending_fee, 0);
        assert_eq!(stats.fee_collected, Amount::from_paise(200_050));

        assert!(h.lifecycle.stats(&h.author).is_err());

        Ok(())
    })
}

#[test]
fn audit_log_paging() {
    run_test(|h: Harness| -> Fallible<()> {
        for i in 0..5 {
            h.submit(&format!("Paper {}", i));
        }

        let page = h.lifecycle.audit_log(&h.admin, None, 2, Some(2))?;
        assert_eq!(page.total, 5);
        assert_eq!(page.entries.len(), 2);
        assert!(page.entries.iter().all(|e| e.action == "SUBMISSION_CREATED"));
        assert_eq!(page.entries[0].actor_role, Some(Role::Author));

        let page = h.lifecycle.audit_log(&h.admin, Some("status"), 1, None)?;
        assert_eq!(page.total, 0);

        let err = h.lifecycle.audit_log(&h.editor, None, 1, None).unwrap_err();
        assert_eq!(err.code().unwrap(), "user:role-not-authorized");

        Ok(())
    })
}

#[test]
fn notification_centre() {
    run_test(|h: Harness| -> Fallible<()> {
        // Notifications are persisted by the store-backed notifier.
        let store = scriptorium::events::StoreNotifier::new(h.db.clone());
        let lifecycle = scriptorium::lifecycle::Lifecycle::new(
            h.db.clone(), h.files.clone(), std::sync::Arc::new(store),
            h.db.clone());

        for i in 0..3 {
            lifecycle.create_submission(&h.author,
                scriptorium::models::NewSubmission {
                    title: format!("Paper {}", i),
                    summary: "Abstract".to_string(),
                    ..Default::default()
                },
                Some(self::common::manuscript("paper.pdf")))?;
        }

        let (list, unread) = lifecycle.notifications(&h.author)?;
        assert_eq!(list.len(), 3);
        assert_eq!(unread, 3);
        assert_eq!(list[0].title, "Submission Received");
        assert!(list[0].message.contains("Paper 2"));

        lifecycle.mark_read(&h.author, list[0].id)?;
        // Other users can't mark someone else's notifications.
        lifecycle.mark_read(&h.editor, list[1].id)?;
        assert_eq!(lifecycle.notifications(&h.author)?.1, 2);

        assert_eq!(lifecycle.mark_all_read(&h.author)?, 2);
        assert_eq!(lifecycle.notifications(&h.author)?.1, 0);
        assert!(lifecycle.notifications(&h.editor)?.0.is_empty());

        Ok(())
    })
}
