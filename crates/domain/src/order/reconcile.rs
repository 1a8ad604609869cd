//! Item reconciliation for order updates.
//!
//! An update payload carries the complete intended item list. Comparing
//! it against the items currently on the order yields three sets:
//! existing items missing from the payload are deleted, payload entries
//! carrying an id update their item in place, and entries without an id
//! become new items.

use std::collections::HashSet;

use order_store::ItemId;
use rust_decimal::Decimal;

use super::{ItemChange, NewItem, OrderError, OrderItem};

/// An in-place edit of one existing item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub id: ItemId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// The effect of reconciling an incoming item list against the items
/// currently on the order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDiff {
    /// Existing items absent from the incoming list.
    pub delete: Vec<ItemId>,

    /// Incoming entries editing an existing item.
    pub update: Vec<ItemUpdate>,

    /// Incoming entries without an id.
    pub insert: Vec<NewItem>,
}

/// Computes the diff between an order's current items and the incoming
/// replacement list.
///
/// Fails with [`OrderError::ForeignItem`] when an incoming entry
/// references an item that does not belong to the order, and with
/// [`OrderError::EmptyItems`] when the incoming list would leave the
/// order without items. Nothing is applied on failure.
pub fn reconcile(existing: &[OrderItem], incoming: &[ItemChange]) -> Result<ItemDiff, OrderError> {
    let existing_ids: HashSet<ItemId> = existing.iter().map(|item| item.id).collect();
    let incoming_ids: HashSet<ItemId> = incoming.iter().filter_map(|change| change.id).collect();

    let mut diff = ItemDiff::default();

    for change in incoming {
        match change.id {
            Some(id) => {
                if !existing_ids.contains(&id) {
                    return Err(OrderError::ForeignItem { item_id: id });
                }
                diff.update.push(ItemUpdate {
                    id,
                    product_name: change.product_name.clone(),
                    quantity: change.quantity,
                    unit_price: change.unit_price,
                });
            }
            None => diff.insert.push(NewItem::new(
                change.product_name.clone(),
                change.quantity,
                change.unit_price,
            )),
        }
    }

    if diff.update.is_empty() && diff.insert.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    for item in existing {
        if !incoming_ids.contains(&item.id) {
            diff.delete.push(item.id);
        }
    }

    Ok(diff)
}
