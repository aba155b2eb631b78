//! The caller's notification inbox, plus admin broadcast.

use chrono::Utc;
use serde::Deserialize;

use opsconsole_auth::{Principal, authorize, permissions::USERS_MANAGE};
use opsconsole_core::{DomainError, ExpectedVersion, NotificationId, UserId};
use opsconsole_events::{ChangeAction, ChangeEvent};
use opsconsole_notifications::{NewNotification, Notification, inbox, unread_count};

use super::{ServiceError, ServiceResult, Services};
use crate::store::WriteBatch;

#[derive(Debug, Clone, Deserialize)]
pub struct SendNotification {
    pub recipients: Vec<UserId>,
    #[serde(flatten)]
    pub notification: NewNotification,
}

impl Services {
    /// Read-state changes go to the owner's stream only.
    fn publish_to_owner(&self, n: &Notification, action: ChangeAction) {
        let mut event = ChangeEvent::for_entity(n, action, Utc::now()).for_user(n.user_id);
        if let Ok(payload) = serde_json::to_value(n) {
            event = event.with_payload(payload);
        }
        self.bus.publish(event);
    }

    async fn own_notification(&self, principal: &Principal, id: NotificationId) -> ServiceResult<Notification> {
        let n = self
            .stores
            .notifications
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("notification {id}")))?;
        n.ensure_owner(principal.user_id)?;
        Ok(n)
    }

    pub async fn inbox(&self, principal: &Principal) -> ServiceResult<Vec<Notification>> {
        Ok(inbox(self.stores.notifications.list().await?, principal.user_id))
    }

    pub async fn unread_count(&self, principal: &Principal) -> ServiceResult<usize> {
        Ok(unread_count(&self.inbox(principal).await?))
    }

    pub async fn mark_notification_read(
        &self,
        principal: &Principal,
        id: NotificationId,
    ) -> ServiceResult<Notification> {
        let mut n = self.own_notification(principal, id).await?;
        if n.mark_read(principal.user_id)? {
            self.stores.notifications.update(n.clone()).await?;
            self.publish_to_owner(&n, ChangeAction::Update);
        }
        Ok(n)
    }

    /// Returns how many notifications flipped to read.
    pub async fn mark_all_notifications_read(&self, principal: &Principal) -> ServiceResult<usize> {
        let mut flipped = Vec::new();
        for mut n in self
            .stores
            .notifications
            .list()
            .await?
            .into_iter()
            .filter(|n| n.user_id == principal.user_id && !n.read)
        {
            if n.mark_read(principal.user_id)? {
                flipped.push(n);
            }
        }

        let mut batch = WriteBatch::new();
        for n in &flipped {
            batch.update(n, ExpectedVersion::Any)?;
        }
        self.commit(batch).await?;
        for n in &flipped {
            self.publish_to_owner(n, ChangeAction::Update);
        }
        Ok(flipped.len())
    }

    pub async fn delete_notification(&self, principal: &Principal, id: NotificationId) -> ServiceResult<()> {
        let n = self.own_notification(principal, id).await?;
        self.stores.notifications.delete(id).await?;
        self.publish_to_owner(&n, ChangeAction::Delete);
        Ok(())
    }

    /// Admin broadcast to named users.
    pub async fn send_notification(
        &self,
        principal: &Principal,
        input: SendNotification,
    ) -> ServiceResult<Vec<Notification>> {
        authorize(principal, &USERS_MANAGE)?;
        if input.recipients.is_empty() {
            return Err(DomainError::validation("at least one recipient is required").into());
        }
        for user in &input.recipients {
            self.stores.accounts.require(*user).await?;
        }
        // notify() only logs a rejected title
        input.notification.fan_out(Vec::new(), Utc::now())?;
        let sent = self.notify(input.recipients, input.notification).await;
        tracing::info!(sent = sent.len(), by = %principal.user_id, "notification sent");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use opsconsole_auth::AppRole;
    use opsconsole_notifications::NotificationKind;

    use super::*;
    use crate::services::testing;

    #[tokio::test]
    async fn inbox_is_private_to_its_owner() {
        let services = testing::services();
        let admin = testing::user(&services, "admin@ops.test", AppRole::Admin, None).await;
        let alice = testing::user(&services, "alice@ops.test", AppRole::Staff, None).await;
        let bob = testing::user(&services, "bob@ops.test", AppRole::Staff, None).await;

        let sent = services
            .send_notification(
                &admin,
                SendNotification {
                    recipients: vec![alice.user_id, bob.user_id, alice.user_id],
                    notification: NewNotification::new(NotificationKind::General, "Fire drill at 10:00"),
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(services.unread_count(&alice).await.unwrap(), 1);

        let alices = services.inbox(&alice).await.unwrap()[0].id;
        assert!(matches!(
            services.mark_notification_read(&bob, alices).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
        services.mark_notification_read(&alice, alices).await.unwrap();
        assert_eq!(services.unread_count(&alice).await.unwrap(), 0);
        assert_eq!(services.unread_count(&bob).await.unwrap(), 1);

        assert_eq!(services.mark_all_notifications_read(&bob).await.unwrap(), 1);
        services.delete_notification(&alice, alices).await.unwrap();
        assert!(services.inbox(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_needs_user_management() {
        let services = testing::services();
        let staff = testing::user(&services, "s@ops.test", AppRole::Staff, None).await;
        assert!(matches!(
            services
                .send_notification(
                    &staff,
                    SendNotification {
                        recipients: vec![staff.user_id],
                        notification: NewNotification::new(NotificationKind::General, "hi"),
                    },
                )
                .await,
            Err(ServiceError::Authz(_))
        ));
    }
}
