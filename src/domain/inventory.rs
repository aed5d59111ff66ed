use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub quantity: u32,
}

/// Ordered item stacks; one stack per item id, empty stacks are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn from_stacks(stacks: Vec<ItemStack>) -> Self {
        let mut inventory = Self::default();
        for stack in stacks {
            inventory.add(&stack.item, stack.quantity);
        }
        inventory
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn quantity(&self, item: &str) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.item == item)
            .map_or(0, |s| s.quantity)
    }

    pub fn add(&mut self, item: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.stacks.iter_mut().find(|s| s.item == item) {
            Some(stack) => stack.quantity = stack.quantity.saturating_add(quantity),
            None => self.stacks.push(ItemStack {
                item: item.to_string(),
                quantity,
            }),
        }
    }

    /// Removes one unit; returns the quantity left, or None when none was held.
    pub fn take_one(&mut self, item: &str) -> Option<u32> {
        let index = self.stacks.iter().position(|s| s.item == item)?;
        let stack = &mut self.stacks[index];
        stack.quantity -= 1;
        let left = stack.quantity;
        if left == 0 {
            self.stacks.remove(index);
        }
        Some(left)
    }
}
