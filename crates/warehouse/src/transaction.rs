use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, ItemId, TransactionId, UserId,
    matches_query, optional_text,
};

use crate::InventoryItem;

pub const HISTORY_LIMIT: usize = 500;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    In,
    Out,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockReason {
    Purchase,
    Return,
    Found,
    Donation,
    Adjustment,
    Issued,
    Project,
    Damaged,
    Expired,
    Lost,
    ReturnedSupplier,
    Transfer,
    Other,
}

impl StockReason {
    pub const STOCK_IN: &'static [StockReason] = &[
        StockReason::Purchase,
        StockReason::Return,
        StockReason::Transfer,
        StockReason::Found,
        StockReason::Donation,
        StockReason::Adjustment,
        StockReason::Other,
    ];

    pub const STOCK_OUT: &'static [StockReason] = &[
        StockReason::Issued,
        StockReason::Project,
        StockReason::Damaged,
        StockReason::Expired,
        StockReason::Lost,
        StockReason::ReturnedSupplier,
        StockReason::Transfer,
        StockReason::Other,
    ];

    pub fn allowed_for(kind: TransactionType) -> &'static [StockReason] {
        match kind {
            TransactionType::In => Self::STOCK_IN,
            TransactionType::Out => Self::STOCK_OUT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockReason::Purchase => "New Purchase",
            StockReason::Return => "Returned Item",
            StockReason::Found => "Found/Recovered",
            StockReason::Donation => "Donation",
            StockReason::Adjustment => "Inventory Adjustment",
            StockReason::Issued => "Issued to Department",
            StockReason::Project => "Used for Project",
            StockReason::Damaged => "Damaged/Broken",
            StockReason::Expired => "Expired",
            StockReason::Lost => "Lost/Missing",
            StockReason::ReturnedSupplier => "Returned to Supplier",
            StockReason::Transfer => "Transfer",
            StockReason::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub item_id: ItemId,
    pub department_id: DepartmentId,
    /// Snapshot for history search after renames or deletes.
    pub item_number: String,
    pub item_name: String,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub reason: StockReason,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub handed_to_user_id: Option<UserId>,
    pub handed_to_department_id: Option<DepartmentId>,
    pub requested_by_user_id: Option<UserId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Entity for StockTransaction {
    type Id = TransactionId;
    const KIND: &'static str = "stock_transactions";

    fn id(&self) -> TransactionId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.department_id)
    }
}

/// Stock in/out request for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub reason: StockReason,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub handed_to_user_id: Option<UserId>,
    #[serde(default)]
    pub handed_to_department_id: Option<DepartmentId>,
    #[serde(default)]
    pub requested_by_user_id: Option<UserId>,
}

impl StockMovement {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if !StockReason::allowed_for(self.transaction_type).contains(&self.reason) {
            return Err(DomainError::validation(format!(
                "reason '{}' is not valid for this transaction type",
                self.reason.label()
            )));
        }
        Ok(())
    }

    /// Apply to `item`, returning the journal row. On error the item is untouched.
    pub fn apply(
        self,
        item: &mut InventoryItem,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<StockTransaction> {
        self.validate()?;
        let previous = item.quantity;
        let new_quantity = match self.transaction_type {
            TransactionType::In => previous
                .checked_add(self.quantity)
                .ok_or_else(|| DomainError::validation("quantity is too large"))?,
            TransactionType::Out => {
                if self.quantity > previous {
                    return Err(DomainError::invariant(format!(
                        "cannot remove {} of '{}': only {previous} available",
                        self.quantity, item.item_name
                    )));
                }
                previous - self.quantity
            }
        };

        item.quantity = new_quantity;
        item.updated_at = now;

        Ok(StockTransaction {
            id: TransactionId::new(),
            item_id: item.id,
            department_id: item.department_id,
            item_number: item.item_number.clone(),
            item_name: item.item_name.clone(),
            transaction_type: self.transaction_type,
            quantity: self.quantity,
            reason: self.reason,
            reference: optional_text(self.reference),
            notes: optional_text(self.notes),
            previous_quantity: previous,
            new_quantity,
            handed_to_user_id: self.handed_to_user_id,
            handed_to_department_id: self.handed_to_department_id,
            requested_by_user_id: self.requested_by_user_id,
            created_by,
            created_at: now,
        })
    }
}

/// True when a decrease takes the item from above its minimum to at or below it.
pub fn crossed_min_threshold(previous: i64, new: i64, min_quantity: i64) -> bool {
    previous > min_quantity && new <= min_quantity
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryWindow {
    #[serde(rename = "1")]
    Day,
    #[default]
    #[serde(rename = "7")]
    Week,
    #[serde(rename = "30")]
    Month,
    #[serde(rename = "90")]
    Quarter,
}

impl HistoryWindow {
    pub fn days(&self) -> i64 {
        match self {
            HistoryWindow::Day => 1,
            HistoryWindow::Week => 7,
            HistoryWindow::Month => 30,
            HistoryWindow::Quarter => 90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub window: HistoryWindow,
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub search: Option<String>,
}

impl TransactionQuery {
    pub fn matches(&self, tx: &StockTransaction, now: DateTime<Utc>) -> bool {
        if tx.created_at < now - Duration::days(self.window.days()) {
            return false;
        }
        if self.transaction_type.is_some_and(|t| t != tx.transaction_type) {
            return false;
        }
        if self.department_id.is_some_and(|d| d != tx.department_id) {
            return false;
        }
        if self.item_id.is_some_and(|i| i != tx.item_id) {
            return false;
        }
        matches_query(
            self.search.as_deref().unwrap_or_default(),
            [
                tx.item_name.as_str(),
                tx.item_number.as_str(),
                tx.reason.label(),
                tx.reference.as_deref().unwrap_or_default(),
                tx.notes.as_deref().unwrap_or_default(),
            ],
        )
    }

    /// Newest first, capped at [`HISTORY_LIMIT`].
    pub fn apply(&self, txs: Vec<StockTransaction>, now: DateTime<Utc>) -> Vec<StockTransaction> {
        let mut out: Vec<StockTransaction> =
            txs.into_iter().filter(|t| self.matches(t, now)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(HISTORY_LIMIT);
        out
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::NewInventoryItem;

    fn item(qty: i64) -> InventoryItem {
        InventoryItem::create(
            DepartmentId::new(),
            NewInventoryItem {
                item_number: "HX-9".into(),
                item_name: "Hex bolts".into(),
                quantity: qty,
                min_quantity: 3,
                ..Default::default()
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    fn movement(kind: TransactionType, qty: i64, reason: StockReason) -> StockMovement {
        StockMovement {
            transaction_type: kind,
            quantity: qty,
            reason,
            reference: None,
            notes: None,
            handed_to_user_id: None,
            handed_to_department_id: None,
            requested_by_user_id: None,
        }
    }

    #[test]
    fn stock_out_beyond_available_is_rejected() {
        let mut i = item(5);
        let before = i.clone();
        let err = movement(TransactionType::Out, 6, StockReason::Issued)
            .apply(&mut i, UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(i, before);
    }

    #[test]
    fn reasons_are_checked_against_direction() {
        let mut i = item(5);
        assert!(movement(TransactionType::In, 1, StockReason::Damaged)
            .apply(&mut i, UserId::new(), Utc::now())
            .is_err());
        assert!(movement(TransactionType::Out, 1, StockReason::Purchase)
            .apply(&mut i, UserId::new(), Utc::now())
            .is_err());
        assert!(movement(TransactionType::Out, 0, StockReason::Issued)
            .apply(&mut i, UserId::new(), Utc::now())
            .is_err());
    }

    #[test]
    fn transaction_records_before_and_after() {
        let mut i = item(5);
        let tx = movement(TransactionType::In, 7, StockReason::Purchase)
            .apply(&mut i, UserId::new(), Utc::now())
            .unwrap();
        assert_eq!((tx.previous_quantity, tx.new_quantity), (5, 12));
        assert_eq!(i.quantity, 12);
    }

    #[test]
    fn threshold_crossing() {
        assert!(crossed_min_threshold(5, 3, 3));
        assert!(!crossed_min_threshold(3, 1, 3));
        assert!(!crossed_min_threshold(10, 4, 3));
    }

    #[test]
    fn history_window_and_order() {
        let now = Utc::now();
        let mut i = item(100);
        let mut txs = Vec::new();
        for days_ago in [0, 3, 10, 40] {
            let mut tx = movement(TransactionType::Out, 1, StockReason::Project)
                .apply(&mut i, UserId::new(), now)
                .unwrap();
            tx.created_at = now - Duration::days(days_ago);
            txs.push(tx);
        }

        let week = TransactionQuery::default().apply(txs.clone(), now);
        assert_eq!(week.len(), 2);
        assert!(week[0].created_at > week[1].created_at);

        let quarter = TransactionQuery {
            window: HistoryWindow::Quarter,
            ..Default::default()
        };
        assert_eq!(quarter.apply(txs, now).len(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn stock_never_goes_negative(start in 0i64..500, ops in prop::collection::vec((any::<bool>(), 1i64..200), 0..30)) {
            let mut i = item(start);
            for (is_in, qty) in ops {
                let (kind, reason) = if is_in {
                    (TransactionType::In, StockReason::Purchase)
                } else {
                    (TransactionType::Out, StockReason::Issued)
                };
                let before = i.quantity;
                match movement(kind, qty, reason).apply(&mut i, UserId::new(), Utc::now()) {
                    Ok(tx) => {
                        prop_assert_eq!(tx.previous_quantity, before);
                        prop_assert_eq!(tx.new_quantity, i.quantity);
                    }
                    Err(_) => prop_assert_eq!(i.quantity, before),
                }
                prop_assert!(i.quantity >= 0);
            }
        }
    }
}
