use std::collections::{HashMap, HashSet};

use serde::Serialize;

use opsconsole_core::{ClassificationId, ItemId};

use crate::{InventoryItem, StockTransaction};

/// Dashboard KPI threshold, independent of per-item minimums.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    pub total_items: usize,
    pub total_quantity: i64,
    pub unique_locations: usize,
    pub low_stock_items: usize,
}

pub fn inventory_stats(items: &[InventoryItem]) -> InventoryStats {
    InventoryStats {
        total_items: items.len(),
        total_quantity: items.iter().map(|i| i.quantity).sum(),
        unique_locations: items
            .iter()
            .map(|i| i.location.as_str())
            .collect::<HashSet<_>>()
            .len(),
        low_stock_items: items
            .iter()
            .filter(|i| i.quantity < LOW_STOCK_THRESHOLD)
            .count(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LowStockReport {
    pub out_of_stock: Vec<InventoryItem>,
    pub low_stock: Vec<InventoryItem>,
}

/// Items at zero, and items above zero but at or under a positive minimum.
/// Both lists ascend by quantity.
pub fn low_stock_report(items: &[InventoryItem]) -> LowStockReport {
    let mut report = LowStockReport::default();
    for item in items {
        if item.quantity == 0 {
            report.out_of_stock.push(item.clone());
        } else if item.min_quantity > 0 && item.quantity <= item.min_quantity {
            report.low_stock.push(item.clone());
        }
    }
    let by_qty = |a: &InventoryItem, b: &InventoryItem| {
        a.quantity
            .cmp(&b.quantity)
            .then_with(|| a.item_number.cmp(&b.item_number))
    };
    report.out_of_stock.sort_by(by_qty);
    report.low_stock.sort_by(by_qty);
    report
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItEquipmentEntry {
    pub item: InventoryItem,
    pub last_transaction: Option<StockTransaction>,
}

/// Items of the IT equipment folder, by name, each with its latest movement.
pub fn it_equipment(
    classification: ClassificationId,
    items: &[InventoryItem],
    transactions: &[StockTransaction],
) -> Vec<ItEquipmentEntry> {
    let mut latest: HashMap<ItemId, &StockTransaction> = HashMap::new();
    for tx in transactions {
        latest
            .entry(tx.item_id)
            .and_modify(|cur| {
                if tx.created_at > cur.created_at {
                    *cur = tx;
                }
            })
            .or_insert(tx);
    }

    let mut out: Vec<ItEquipmentEntry> = items
        .iter()
        .filter(|i| i.classification_id == Some(classification))
        .map(|i| ItEquipmentEntry {
            item: i.clone(),
            last_transaction: latest.get(&i.id).map(|t| (*t).clone()),
        })
        .collect();
    out.sort_by(|a, b| a.item.item_name.cmp(&b.item.item_name));
    out
}
