//! Multi-item stock requests.
//!
//! A request is recorded once the paper approval exists, so it is created
//! directly in `completed` state and immediately draws down stock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    ApproverId, DepartmentId, DomainError, DomainResult, Entity, ItemId, ItemRequestId, UserId,
    optional_text, require_text,
};

use crate::{
    Approver, InventoryItem, StockMovement, StockReason, StockTransaction, TransactionType,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRequestStatus {
    Pending,
    Approved,
    Rejected,
    #[default]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub item_id: ItemId,
    pub item_number: String,
    pub item_name: String,
    pub quantity: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub id: ItemRequestId,
    pub department_id: DepartmentId,
    pub requester_id: UserId,
    pub requester_name: String,
    pub requester_department_id: Option<DepartmentId>,
    pub requester_department_text: Option<String>,
    pub item_description: String,
    pub usage_purpose: Option<String>,
    pub approved_by_id: ApproverId,
    pub approval_proof_url: String,
    pub approval_date: DateTime<Utc>,
    pub status: ItemRequestStatus,
    pub notes: Option<String>,
    pub quantity_requested: i64,
    pub requested_items: Vec<RequestedItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ItemRequest {
    type Id = ItemRequestId;
    const KIND: &'static str = "item_requests";

    fn id(&self) -> ItemRequestId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

/// Client-supplied line. Stock figures are always recomputed server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItemRequest {
    pub requester_name: String,
    #[serde(default)]
    pub requester_department_id: Option<DepartmentId>,
    #[serde(default)]
    pub requester_department_text: Option<String>,
    #[serde(default)]
    pub item_description: Option<String>,
    #[serde(default)]
    pub usage_purpose: Option<String>,
    pub approved_by_id: ApproverId,
    pub approval_proof_url: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<RequestLine>,
}

/// The recorded request plus every stock change it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub request: ItemRequest,
    pub updated_items: Vec<InventoryItem>,
    pub transactions: Vec<StockTransaction>,
}

impl ItemRequest {
    /// Validate every line against `stock` before touching any quantity.
    pub fn record(
        department_id: DepartmentId,
        requester_id: UserId,
        input: NewItemRequest,
        approver: &Approver,
        stock: &HashMap<ItemId, InventoryItem>,
        now: DateTime<Utc>,
    ) -> DomainResult<RecordedRequest> {
        let requester_name = require_text("requester_name", &input.requester_name)?;
        let approval_proof_url = require_text("approval_proof_url", &input.approval_proof_url)?;
        if approver.id != input.approved_by_id || !approver.is_active {
            return Err(DomainError::validation("approver must be an active approver"));
        }
        if input.items.is_empty() {
            return Err(DomainError::validation("a request must include at least one item"));
        }

        let mut seen = HashSet::new();
        for line in &input.items {
            if !seen.insert(line.item_id) {
                return Err(DomainError::validation(format!(
                    "item {} is listed more than once",
                    line.item_id
                )));
            }
            if line.quantity < 1 {
                return Err(DomainError::validation("each item quantity must be at least 1"));
            }
            let item = stock
                .get(&line.item_id)
                .filter(|i| i.department_id == department_id)
                .ok_or_else(|| DomainError::not_found(format!("inventory item {}", line.item_id)))?;
            if line.quantity > item.quantity {
                return Err(DomainError::invariant(format!(
                    "cannot request {} of '{}': only {} available",
                    line.quantity, item.item_name, item.quantity
                )));
            }
        }

        let id = ItemRequestId::new();
        let mut requested_items = Vec::with_capacity(input.items.len());
        let mut updated_items = Vec::with_capacity(input.items.len());
        let mut transactions = Vec::with_capacity(input.items.len());

        for line in &input.items {
            let Some(current) = stock.get(&line.item_id) else {
                continue;
            };
            let mut item = current.clone();
            let tx = StockMovement {
                transaction_type: TransactionType::Out,
                quantity: line.quantity,
                reason: StockReason::Issued,
                reference: Some(format!("item-request:{id}")),
                notes: optional_text(input.usage_purpose.clone()),
                handed_to_user_id: None,
                handed_to_department_id: input.requester_department_id,
                requested_by_user_id: Some(requester_id),
            }
            .apply(&mut item, requester_id, now)?;

            requested_items.push(RequestedItem {
                item_id: item.id,
                item_number: item.item_number.clone(),
                item_name: item.item_name.clone(),
                quantity: line.quantity,
                previous_quantity: tx.previous_quantity,
                new_quantity: tx.new_quantity,
            });
            transactions.push(tx);
            updated_items.push(item);
        }

        let item_description = optional_text(input.item_description).unwrap_or_else(|| {
            requested_items
                .iter()
                .map(|r| format!("{} x{}", r.item_name, r.quantity))
                .collect::<Vec<_>>()
                .join(", ")
        });

        let request = ItemRequest {
            id,
            department_id,
            requester_id,
            requester_name,
            requester_department_id: input.requester_department_id,
            requester_department_text: optional_text(input.requester_department_text),
            item_description,
            usage_purpose: optional_text(input.usage_purpose),
            approved_by_id: approver.id,
            approval_proof_url,
            approval_date: now,
            status: ItemRequestStatus::Completed,
            notes: optional_text(input.notes),
            quantity_requested: requested_items.iter().map(|r| r.quantity).sum(),
            requested_items,
            created_at: now,
            updated_at: now,
        };

        Ok(RecordedRequest {
            request,
            updated_items,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{NewApprover, NewInventoryItem};

    fn approver() -> Approver {
        Approver::create(
            NewApprover {
                full_name: "Store Manager".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn stock(dept: DepartmentId, quantities: &[i64]) -> HashMap<ItemId, InventoryItem> {
        quantities
            .iter()
            .enumerate()
            .map(|(n, q)| {
                let item = InventoryItem::create(
                    dept,
                    NewInventoryItem {
                        item_number: format!("IT-{n:03}"),
                        item_name: format!("Item {n}"),
                        quantity: *q,
                        ..Default::default()
                    },
                    UserId::new(),
                    Utc::now(),
                )
                .unwrap();
                (item.id, item)
            })
            .collect()
    }

    fn input(approver: &Approver, items: Vec<RequestLine>) -> NewItemRequest {
        NewItemRequest {
            requester_name: "Field crew".into(),
            requester_department_id: None,
            requester_department_text: Some("Operations".into()),
            item_description: None,
            usage_purpose: Some("Pump repair".into()),
            approved_by_id: approver.id,
            approval_proof_url: "/storage/approval-proofs/req.jpg".into(),
            notes: None,
            items,
        }
    }

    #[test]
    fn empty_requests_are_rejected() {
        let a = approver();
        let dept = DepartmentId::new();
        let err = ItemRequest::record(dept, UserId::new(), input(&a, vec![]), &a, &stock(dept, &[]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn inactive_approver_is_rejected() {
        let mut a = approver();
        a.deactivate(Utc::now());
        let dept = DepartmentId::new();
        let s = stock(dept, &[5]);
        let line = RequestLine {
            item_id: *s.keys().next().unwrap(),
            quantity: 1,
        };
        assert!(ItemRequest::record(dept, UserId::new(), input(&a, vec![line]), &a, &s, Utc::now()).is_err());
    }

    #[test]
    fn duplicate_lines_are_rejected() {
        let a = approver();
        let dept = DepartmentId::new();
        let s = stock(dept, &[5]);
        let id = *s.keys().next().unwrap();
        let lines = vec![
            RequestLine { item_id: id, quantity: 1 },
            RequestLine { item_id: id, quantity: 1 },
        ];
        assert!(ItemRequest::record(dept, UserId::new(), input(&a, lines), &a, &s, Utc::now()).is_err());
    }

    #[test]
    fn lines_record_server_side_quantities() {
        let a = approver();
        let dept = DepartmentId::new();
        let s = stock(dept, &[10, 4]);
        let lines: Vec<RequestLine> = s
            .values()
            .map(|i| RequestLine {
                item_id: i.id,
                quantity: 3,
            })
            .collect();
        let rec = ItemRequest::record(dept, UserId::new(), input(&a, lines), &a, &s, Utc::now()).unwrap();

        assert_eq!(rec.request.status, ItemRequestStatus::Completed);
        assert_eq!(rec.request.quantity_requested, 6);
        for line in &rec.request.requested_items {
            assert_eq!(line.previous_quantity, s[&line.item_id].quantity);
            assert_eq!(line.new_quantity, line.previous_quantity - 3);
        }
        assert_eq!(rec.transactions.len(), 2);
        assert!(rec.request.item_description.contains("x3"));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn all_or_nothing_reconciliation(
            lines in prop::collection::vec((0i64..20, 1i64..25), 1..8)
        ) {
            let a = approver();
            let dept = DepartmentId::new();
            let quantities: Vec<i64> = lines.iter().map(|(q, _)| *q).collect();
            let s = stock(dept, &quantities);
            let mut ids: Vec<ItemId> = s.keys().copied().collect();
            ids.sort_by_key(|id| s[id].item_number.clone());

            let request_lines: Vec<RequestLine> = ids
                .iter()
                .zip(lines.iter())
                .map(|(id, (_, want))| RequestLine { item_id: *id, quantity: *want })
                .collect();
            let fits = request_lines.iter().all(|l| l.quantity <= s[&l.item_id].quantity);

            match ItemRequest::record(dept, UserId::new(), input(&a, request_lines.clone()), &a, &s, Utc::now()) {
                Ok(rec) => {
                    prop_assert!(fits);
                    let taken: i64 = request_lines.iter().map(|l| l.quantity).sum();
                    let before: i64 = rec.updated_items.iter().map(|i| s[&i.id].quantity).sum();
                    let after: i64 = rec.updated_items.iter().map(|i| i.quantity).sum();
                    prop_assert_eq!(before - after, taken);
                    prop_assert!(rec.updated_items.iter().all(|i| i.quantity >= 0));
                }
                Err(_) => prop_assert!(!fits),
            }
        }
    }
}
