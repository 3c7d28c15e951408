use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::CommerceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QuantityAction {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuantityChange {
    pub quantity: u32,
    /// Set when the quantity was already at the edge of its range.
    pub blocked: bool,
}

/// Per-item order quantities for the session. Items start at the minimum
/// and keep their count while the carousel moves elsewhere.
#[derive(Debug, Clone)]
pub struct QuantityState {
    quantities: BTreeMap<String, u32>,
    min: u32,
    max: u32,
}

impl QuantityState {
    pub fn new(config: &CommerceConfig) -> Self {
        let min = config.min_quantity;
        let max = config.max_quantity.max(min);
        Self {
            quantities: BTreeMap::new(),
            min,
            max,
        }
    }

    pub fn quantity(&self, key: &str) -> u32 {
        self.quantities.get(key).copied().unwrap_or(self.min)
    }

    pub fn adjust(&mut self, key: &str, action: QuantityAction) -> QuantityChange {
        let current = self.quantity(key);
        let next = match action {
            QuantityAction::Increment if current < self.max => current + 1,
            QuantityAction::Decrement if current > self.min => current - 1,
            _ => {
                return QuantityChange {
                    quantity: current,
                    blocked: true,
                };
            }
        };
        self.quantities.insert(key.to_string(), next);
        QuantityChange {
            quantity: next,
            blocked: false,
        }
    }

    pub fn reset(&mut self) {
        self.quantities.clear();
    }
}

/// Spending balance. Charges and refunds both clamp to `[0, initial]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Wallet {
    balance: f64,
    initial: f64,
}

impl Wallet {
    pub fn new(initial: f64) -> Self {
        let initial = if initial.is_finite() { initial.max(0.0) } else { 0.0 };
        Self {
            balance: initial,
            initial,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn charge(&mut self, amount: f64) {
        self.set(self.balance - amount);
    }

    pub fn refund(&mut self, amount: f64) {
        self.set(self.balance + amount);
    }

    pub fn reset(&mut self) {
        self.balance = self.initial;
    }

    fn set(&mut self, value: f64) {
        if value.is_finite() {
            self.balance = value.clamp(0.0, self.initial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantities() -> QuantityState {
        QuantityState::new(&CommerceConfig::default())
    }

    #[test]
    fn increment_at_max_is_blocked() {
        let mut state = quantities();
        for expected in 2..=9 {
            let change = state.adjust("burger", QuantityAction::Increment);
            assert_eq!(change.quantity, expected);
            assert!(!change.blocked);
        }
        let change = state.adjust("burger", QuantityAction::Increment);
        assert!(change.blocked);
        assert_eq!(change.quantity, 9);
        assert_eq!(state.quantity("burger"), 9);
    }

    #[test]
    fn decrement_at_min_is_blocked() {
        let mut state = quantities();
        let change = state.adjust("fries", QuantityAction::Decrement);
        assert!(change.blocked);
        assert_eq!(change.quantity, 1);
    }

    #[test]
    fn quantities_are_independent_per_item() {
        let mut state = quantities();
        state.adjust("burger", QuantityAction::Increment);
        state.adjust("burger", QuantityAction::Increment);
        assert_eq!(state.quantity("burger"), 3);
        assert_eq!(state.quantity("fries"), 1);
    }

    #[test]
    fn wallet_clamps_both_ways() {
        let mut wallet = Wallet::new(10.0);
        wallet.charge(4.0);
        assert_eq!(wallet.balance(), 6.0);
        wallet.charge(50.0);
        assert_eq!(wallet.balance(), 0.0);
        wallet.refund(3.0);
        assert_eq!(wallet.balance(), 3.0);
        wallet.refund(100.0);
        assert_eq!(wallet.balance(), 10.0);
        wallet.charge(f64::NAN);
        assert_eq!(wallet.balance(), 10.0);
    }
}
