use serde::{Deserialize, Serialize};

use crate::domain::common::money::ensure_non_negative;
use crate::domain::common::BaseAggregate;

crate::aggregate_id!(InventoryItemId);

crate::string_enum! {
    pub enum ItemKind {
        Vehicle => "VEHICLE",
        Accessory => "ACCESSORY",
        SparePart => "SPARE_PART",
    }
}

crate::string_enum! {
    pub enum StockStatus {
        InStock => "IN_STOCK",
        Reserved => "RESERVED",
        Sold => "SOLD",
    }
}

/// Stock item. Vehicles are tracked one row per chassis with quantity 0 or 1;
/// accessories and spare parts carry a running quantity.
/// `base.code` is the SKU, `base.description` the model / part name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(flatten)]
    pub base: BaseAggregate<InventoryItemId>,
    pub kind: ItemKind,
    pub variant: Option<String>,
    pub color: Option<String>,
    pub chassis_no: Option<String>,
    pub motor_no: Option<String>,
    pub battery_no: Option<String>,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub purchase_price: f64,
    pub selling_price: f64,
    pub status: StockStatus,
}

impl InventoryItem {
    pub fn new_for_insert(dto: &InventoryItemDto) -> Self {
        let mut base = BaseAggregate::new(
            InventoryItemId::new_v4(),
            dto.sku.trim().to_string(),
            dto.model.trim().to_string(),
        );
        base.comment = dto.comment.clone();

        let quantity = match dto.kind {
            ItemKind::Vehicle => 1,
            _ => dto.quantity.unwrap_or(0),
        };

        Self {
            base,
            kind: dto.kind,
            variant: dto.variant.clone(),
            color: dto.color.clone(),
            chassis_no: dto.chassis_no.clone(),
            motor_no: dto.motor_no.clone(),
            battery_no: dto.battery_no.clone(),
            quantity,
            low_stock_threshold: dto.low_stock_threshold.unwrap_or(0),
            purchase_price: dto.purchase_price,
            selling_price: dto.selling_price,
            status: StockStatus::InStock,
        }
    }

    /// Sold items are frozen; `kind` cannot change after insert
    pub fn update(&mut self, dto: &InventoryItemDto) -> Result<(), String> {
        if self.status == StockStatus::Sold {
            return Err(format!("Item {} is sold and cannot be edited", self.base.code));
        }
        if dto.kind != self.kind {
            return Err("Item kind cannot be changed".into());
        }
        self.base.code = dto.sku.trim().to_string();
        self.base.description = dto.model.trim().to_string();
        self.base.comment = dto.comment.clone();
        self.variant = dto.variant.clone();
        self.color = dto.color.clone();
        self.chassis_no = dto.chassis_no.clone();
        self.motor_no = dto.motor_no.clone();
        self.battery_no = dto.battery_no.clone();
        if self.kind != ItemKind::Vehicle {
            if let Some(quantity) = dto.quantity {
                self.quantity = quantity;
            }
        }
        if let Some(threshold) = dto.low_stock_threshold {
            self.low_stock_threshold = threshold;
        }
        self.purchase_price = dto.purchase_price;
        self.selling_price = dto.selling_price;
        if let Some(status) = dto.status {
            self.set_reservation(status)?;
        }
        Ok(())
    }

    fn set_reservation(&mut self, status: StockStatus) -> Result<(), String> {
        match status {
            StockStatus::Sold => Err("Items are marked sold only through a sale".into()),
            StockStatus::Reserved if self.kind != ItemKind::Vehicle => {
                Err("Only vehicles can be reserved".into())
            }
            status => {
                self.status = status;
                Ok(())
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.code.trim().is_empty() {
            return Err("SKU cannot be empty".into());
        }
        if self.base.description.trim().is_empty() {
            return Err("Model / name cannot be empty".into());
        }
        if self.quantity < 0 {
            return Err("Quantity cannot be negative".into());
        }
        if self.low_stock_threshold < 0 {
            return Err("Low stock threshold cannot be negative".into());
        }
        ensure_non_negative("purchase_price", self.purchase_price)?;
        ensure_non_negative("selling_price", self.selling_price)?;
        if self.kind == ItemKind::Vehicle {
            if self.chassis_no.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err("Vehicles require a chassis number".into());
            }
            if self.quantity > 1 {
                return Err("A vehicle row represents exactly one unit".into());
            }
        }
        Ok(())
    }

    pub fn is_available_vehicle(&self) -> bool {
        self.kind == ItemKind::Vehicle
            && self.quantity == 1
            && matches!(self.status, StockStatus::InStock | StockStatus::Reserved)
    }

    pub fn is_low_stock(&self) -> bool {
        self.kind != ItemKind::Vehicle && self.quantity <= self.low_stock_threshold
    }

    /// Take `quantity` units out of stock. Vehicles flip to `Sold`.
    pub fn deduct(&mut self, quantity: i32) -> Result<(), String> {
        if quantity <= 0 {
            return Err("Quantity must be positive".into());
        }
        match self.kind {
            ItemKind::Vehicle => {
                if quantity != 1 {
                    return Err("A vehicle is sold one unit at a time".into());
                }
                if !self.is_available_vehicle() {
                    return Err(format!(
                        "Vehicle {} is not available (status {})",
                        self.base.code, self.status
                    ));
                }
                self.quantity = 0;
                self.status = StockStatus::Sold;
            }
            _ => {
                if self.quantity < quantity {
                    return Err(format!(
                        "Insufficient stock for {}: requested {}, available {}",
                        self.base.code, quantity, self.quantity
                    ));
                }
                self.quantity -= quantity;
            }
        }
        Ok(())
    }

    pub fn receive(&mut self, quantity: i32) -> Result<(), String> {
        if self.kind == ItemKind::Vehicle {
            return Err("Vehicles are added as individual items, not received".into());
        }
        if quantity <= 0 {
            return Err("Received quantity must be positive".into());
        }
        self.quantity += quantity;
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

crate::impl_aggregate_root!(
    InventoryItem,
    InventoryItemId,
    "a003",
    "inventory_item",
    "Inventory item",
    "Inventory"
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemDto {
    pub id: Option<String>,
    pub sku: String,
    pub model: String,
    pub kind: ItemKind,
    pub variant: Option<String>,
    pub color: Option<String>,
    pub chassis_no: Option<String>,
    pub motor_no: Option<String>,
    pub battery_no: Option<String>,
    pub quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub selling_price: f64,
    /// Only `IN_STOCK` / `RESERVED` are accepted
    pub status: Option<StockStatus>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveStockDto {
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InventoryListQuery {
    pub kind: Option<ItemKind>,
    pub status: Option<StockStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> InventoryItem {
        InventoryItem::new_for_insert(&InventoryItemDto {
            id: None,
            sku: "EV-S1-RED-001".into(),
            model: "S1 Pro".into(),
            kind: ItemKind::Vehicle,
            variant: Some("Gen 2".into()),
            color: Some("Red".into()),
            chassis_no: Some("MD9S1PRO0001".into()),
            motor_no: None,
            battery_no: None,
            quantity: None,
            low_stock_threshold: None,
            purchase_price: 110_000.0,
            selling_price: 129_999.0,
            status: None,
            comment: None,
        })
    }

    fn helmet(quantity: i32) -> InventoryItem {
        let mut item = vehicle();
        item.kind = ItemKind::Accessory;
        item.chassis_no = None;
        item.quantity = quantity;
        item.low_stock_threshold = 2;
        item
    }

    #[test]
    fn vehicle_is_sold_on_deduct() {
        let mut v = vehicle();
        assert!(v.validate().is_ok());
        v.deduct(1).unwrap();
        assert_eq!(v.status, StockStatus::Sold);
        assert_eq!(v.quantity, 0);
        assert!(v.deduct(1).is_err());
    }

    #[test]
    fn vehicle_requires_chassis() {
        let mut v = vehicle();
        v.chassis_no = Some("  ".into());
        assert!(v.validate().is_err());
    }

    #[test]
    fn accessory_quantity_never_goes_negative() {
        let mut h = helmet(3);
        h.deduct(2).unwrap();
        assert_eq!(h.quantity, 1);
        assert!(h.deduct(2).is_err());
        assert_eq!(h.quantity, 1);
        assert!(h.is_low_stock());
    }

    #[test]
    fn receive_only_for_stocked_kinds() {
        let mut h = helmet(0);
        h.receive(5).unwrap();
        assert_eq!(h.quantity, 5);
        assert!(vehicle().receive(1).is_err());
    }

    #[test]
    fn only_vehicles_can_be_reserved() {
        let mut h = helmet(4);
        assert!(h.set_reservation(StockStatus::Reserved).is_err());
        let mut v = vehicle();
        v.set_reservation(StockStatus::Reserved).unwrap();
        assert!(v.is_available_vehicle());
        assert!(v.set_reservation(StockStatus::Sold).is_err());
    }
}
