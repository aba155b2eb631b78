//! Support tickets: any department raises them, the service desk works them.

use chrono::Utc;

use opsconsole_auth::{
    AppRole, AuthzError, Principal, authorize, authorize_in_department,
    permissions::{TICKETS_CREATE, TICKETS_READ},
};
use opsconsole_core::TicketId;
use opsconsole_helpdesk::{
    NewTicket, SupportTicket, TicketPatch, TicketQuery, TicketStats, ticket_stats,
};
use opsconsole_notifications::{NewNotification, NotificationKind};

use super::{Change, ServiceResult, Services, ensure_record_access};

impl Services {
    /// Members of the configured service-desk department, and super_admin.
    pub async fn is_service_desk(&self, principal: &Principal) -> ServiceResult<bool> {
        if principal.is_super_admin() {
            return Ok(true);
        }
        Ok(self
            .department_by_code(&self.config.service_desk_department_code)
            .await?
            .is_some_and(|desk| principal.is_in_department(desk.id)))
    }

    pub async fn create_ticket(&self, principal: &Principal, input: NewTicket) -> ServiceResult<SupportTicket> {
        authorize_in_department(principal, &TICKETS_CREATE, input.requesting_department_id)?;
        self.stores.departments.require(input.requesting_department_id).await?;

        let ticket = SupportTicket::open(input, principal.user_id, Utc::now())?;
        self.stores.tickets.insert(ticket.clone()).await?;
        self.journal(principal, Change::insert(&ticket)).await;
        tracing::info!(ticket_id = %ticket.id, number = %ticket.ticket_number, "ticket opened");

        match self
            .department_by_code(&self.config.service_desk_department_code)
            .await
        {
            Ok(Some(desk)) => match self.department_members(desk.id, AppRole::Staff).await {
                Ok(staff) => {
                    self.notify(
                        staff.into_iter().filter(|u| *u != principal.user_id),
                        NewNotification::new(
                            NotificationKind::Ticket,
                            format!("New ticket {}", ticket.ticket_number),
                        )
                        .with_message(ticket.title.clone())
                        .with_link(format!("/tickets/{}", ticket.id)),
                    )
                    .await;
                }
                Err(e) => tracing::warn!(error = %e, "service desk lookup failed"),
            },
            Ok(None) => tracing::warn!(
                code = %self.config.service_desk_department_code,
                "service desk department not found; ticket not announced"
            ),
            Err(e) => tracing::warn!(error = %e, "service desk lookup failed"),
        }
        Ok(ticket)
    }

    /// Own departments' tickets; the service desk sees every ticket.
    pub async fn list_tickets(
        &self,
        principal: &Principal,
        query: &TicketQuery,
    ) -> ServiceResult<Vec<SupportTicket>> {
        authorize(principal, &TICKETS_READ)?;
        let tickets = if self.is_service_desk(principal).await? {
            self.stores.tickets.list().await?
        } else {
            self.scoped(&self.stores.tickets, principal).await?
        };
        Ok(query.apply(tickets))
    }

    pub async fn get_ticket(&self, principal: &Principal, id: TicketId) -> ServiceResult<SupportTicket> {
        let ticket = self.stores.tickets.require(id).await?;
        if !self.is_service_desk(principal).await? {
            ensure_record_access(principal, &TICKETS_READ, &ticket)?;
        }
        Ok(ticket)
    }

    /// Status, priority and assignee changes; the requester hears about
    /// status moves.
    pub async fn update_ticket(
        &self,
        principal: &Principal,
        id: TicketId,
        patch: TicketPatch,
    ) -> ServiceResult<SupportTicket> {
        if !self.is_service_desk(principal).await? {
            return Err(AuthzError::policy("Only the service desk can update tickets").into());
        }
        let before = self.stores.tickets.require(id).await?;
        let mut ticket = before.clone();
        let moved = ticket.apply(patch, principal.user_id, Utc::now())?;

        self.stores.tickets.update(ticket.clone()).await?;
        self.journal(principal, Change::update(&before, &ticket)).await;

        if let Some(previous) = moved {
            tracing::info!(
                ticket_id = %id,
                from = previous.as_str(),
                to = ticket.status.as_str(),
                "ticket status changed"
            );
            if ticket.requested_by != principal.user_id {
                self.notify(
                    [ticket.requested_by],
                    NewNotification::new(
                        NotificationKind::Ticket,
                        format!("Ticket {} is now {}", ticket.ticket_number, ticket.status.as_str()),
                    )
                    .with_message(ticket.title.clone())
                    .with_link(format!("/tickets/{}", ticket.id)),
                )
                .await;
            }
        }
        Ok(ticket)
    }

    pub async fn ticket_stats(&self, principal: &Principal) -> ServiceResult<TicketStats> {
        let tickets = self.list_tickets(principal, &TicketQuery::default()).await?;
        Ok(ticket_stats(&tickets))
    }
}

#[cfg(test)]
mod tests {
    use opsconsole_core::DomainError;
    use opsconsole_helpdesk::{TicketCategory, TicketPriority, TicketStatus};

    use super::*;
    use crate::services::{ServiceError, testing};

    #[tokio::test]
    async fn tickets_flow_between_requester_and_service_desk() {
        let services = testing::services();
        let it = testing::department(&services, "IT").await;
        let wh = testing::department(&services, "WH").await;
        let tech = testing::user(&services, "tech@ops.test", AppRole::Staff, Some(it.id)).await;
        let clerk = testing::user(&services, "clerk@ops.test", AppRole::Staff, Some(wh.id)).await;

        let ticket = services
            .create_ticket(
                &clerk,
                NewTicket {
                    title: "Printer offline".into(),
                    description: None,
                    category: TicketCategory::Hardware,
                    priority: TicketPriority::High,
                    requesting_department_id: wh.id,
                },
            )
            .await
            .unwrap();
        assert!(ticket.ticket_number.starts_with("TKT-"));

        let desk_inbox = services.stores.notifications.list().await.unwrap();
        assert_eq!(desk_inbox.len(), 1);
        assert_eq!(desk_inbox[0].user_id, tech.user_id);

        assert!(matches!(
            services
                .update_ticket(
                    &clerk,
                    ticket.id,
                    TicketPatch {
                        status: Some(TicketStatus::Closed),
                        ..Default::default()
                    }
                )
                .await,
            Err(ServiceError::Authz(_))
        ));

        let resolved = services
            .update_ticket(
                &tech,
                ticket.id,
                TicketPatch {
                    status: Some(TicketStatus::Resolved),
                    assigned_to: Some(tech.user_id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.resolved_by, Some(tech.user_id));

        let clerk_notes: Vec<_> = services
            .stores
            .notifications
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.user_id == clerk.user_id)
            .collect();
        assert_eq!(clerk_notes.len(), 1);
        assert_eq!(clerk_notes[0].kind, NotificationKind::Ticket);

        // the service desk sees every department's queue; the clerk only theirs
        assert_eq!(services.list_tickets(&tech, &TicketQuery::default()).await.unwrap().len(), 1);
        let stats = services.ticket_stats(&clerk).await.unwrap();
        assert_eq!((stats.total, stats.resolved, stats.high), (1, 1, 0));
    }

    #[tokio::test]
    async fn closed_tickets_stay_closed() {
        let services = testing::services();
        let it = testing::department(&services, "IT").await;
        let tech = testing::user(&services, "tech@ops.test", AppRole::Staff, Some(it.id)).await;
        let ticket = services
            .create_ticket(
                &tech,
                NewTicket {
                    title: "VPN access".into(),
                    description: None,
                    category: TicketCategory::Access,
                    priority: TicketPriority::Low,
                    requesting_department_id: it.id,
                },
            )
            .await
            .unwrap();

        let close = TicketPatch {
            status: Some(TicketStatus::Closed),
            ..Default::default()
        };
        services.update_ticket(&tech, ticket.id, close).await.unwrap();
        let reopen = TicketPatch {
            status: Some(TicketStatus::Open),
            ..Default::default()
        };
        assert!(matches!(
            services.update_ticket(&tech, ticket.id, reopen).await,
            Err(ServiceError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn raising_for_a_foreign_department_is_denied() {
        let services = testing::services();
        let wh = testing::department(&services, "WH").await;
        let flt = testing::department(&services, "FLT").await;
        let clerk = testing::user(&services, "clerk@ops.test", AppRole::Staff, Some(wh.id)).await;
        assert!(matches!(
            services
                .create_ticket(
                    &clerk,
                    NewTicket {
                        title: "Not mine".into(),
                        description: None,
                        category: TicketCategory::Other,
                        priority: TicketPriority::Low,
                        requesting_department_id: flt.id,
                    },
                )
                .await,
            Err(ServiceError::Authz(AuthzError::DepartmentDenied(_)))
        ));
    }
}
