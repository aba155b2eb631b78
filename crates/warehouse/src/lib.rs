//! Warehouse inventory.
//!
//! Folder hierarchy (classifications holding locations holding items), stock
//! movements, multi-item requests reconciled against current stock, bulk
//! import, and the derived views (KPIs, folder stats, low-stock report, IT
//! equipment).

pub mod approver;
pub mod folder;
pub mod import;
pub mod item;
pub mod report;
pub mod request;
pub mod transaction;

pub use approver::{Approver, ApproverPatch, NewApprover, active_by_name};
pub use folder::{
    Classification, ClassificationPatch, DEFAULT_FOLDER_COLOR, DEFAULT_FOLDER_ICON, FolderStats,
    Location, LocationPatch, NewClassification, NewLocation, classification_stats, location_stats,
    next_sort_order,
};
pub use import::{
    ImportRow, MAX_IMPORT_ROWS, import_item_number, plan_import, random_import_suffix,
};
pub use item::{InventoryItem, ItemPatch, ItemQuery, NewInventoryItem};
pub use report::{
    ItEquipmentEntry, InventoryStats, LOW_STOCK_THRESHOLD, LowStockReport, inventory_stats,
    it_equipment, low_stock_report,
};
pub use request::{
    ItemRequest, ItemRequestStatus, NewItemRequest, RecordedRequest, RequestLine, RequestedItem,
};
pub use transaction::{
    HISTORY_LIMIT, HistoryWindow, StockMovement, StockReason, StockTransaction, TransactionQuery,
    TransactionType, crossed_min_threshold,
};
