//! Gas Meter: a plain struct with `validate_opcode`/`settle_on_halt`/
//! `remaining` methods, owned by the runtime rather than implemented as a
//! trait object. Models the bootstrap exemption and the `DelayPayment` escape
//! hatch nested trigger invocations need.

use crate::error::{Error, Result};
use tx_core::Address;

#[derive(Debug, Clone)]
pub struct GasMeter {
    pub used_gas: i128,
    pub paid_gas: i128,
    pub max_gas: i128,
    pub gas_price: i128,
    pub minimum_fee: i128,
    pub gas_target: Option<Address>,
    pub fee_target_address: Option<Address>,
    pub delay_payment: bool,
    genesis_established: bool,
    read_only_mode: bool,
    block_operation_mode: bool,
}

impl GasMeter {
    pub fn new(
        max_gas: i128,
        minimum_fee: i128,
        genesis_established: bool,
        read_only_mode: bool,
    ) -> Self {
        Self {
            used_gas: 0,
            paid_gas: 0,
            max_gas,
            gas_price: 0,
            minimum_fee,
            gas_target: None,
            fee_target_address: None,
            delay_payment: false,
            genesis_established,
            read_only_mode,
            block_operation_mode: false,
        }
    }

    /// `BlockCreate` additionally enters block-operation mode: all further
    /// opcodes are free. Set by the Runtime when it authorizes a
    /// `BlockCreate` event.
    pub fn set_block_operation_mode(&mut self, on: bool) {
        self.block_operation_mode = on;
    }

    pub fn block_operation_mode(&self) -> bool {
        self.block_operation_mode
    }

    /// A child meter for a trigger invocation: `DelayPayment := true`.
    pub fn child_for_trigger(&self) -> Self {
        let mut child = Self::new(
            self.max_gas,
            self.minimum_fee,
            self.genesis_established,
            self.read_only_mode,
        );
        child.delay_payment = true;
        child
    }

    /// If genesis is not yet established, or read-only mode is active, gas
    /// is free (the bootstrap exemption).
    pub fn is_gas_free(&self) -> bool {
        !self.genesis_established || self.read_only_mode || self.block_operation_mode
    }

    /// `ValidateOpcode(op)`: debits the opcode's cost into `UsedGas`, faulting
    /// if the budget is exceeded and `DelayPayment` is not set.
    pub fn validate_opcode(&mut self, cost: u64) -> Result<()> {
        if self.is_gas_free() {
            return Ok(());
        }
        self.used_gas = self.used_gas.saturating_add(cost as i128);
        if self.used_gas > self.max_gas && !self.delay_payment {
            return Err(Error::GasExhausted {
                used: self.used_gas,
                max: self.max_gas,
            });
        }
        Ok(())
    }

    /// `GasEscrow` event handling: only reachable once the Runtime has
    /// checked the emitting contract is `gas` — this method only enforces the
    /// numeric invariant.
    pub fn apply_gas_escrow(&mut self, price: i128, amount: i128, target: Address) -> Result<()> {
        if price < self.minimum_fee {
            return Err(Error::GasPriceBelowMinimum {
                price,
                minimum: self.minimum_fee,
            });
        }
        self.max_gas = amount;
        self.gas_price = price;
        self.gas_target = Some(target);
        Ok(())
    }

    /// `GasPayment` event handling.
    pub fn apply_gas_payment(&mut self, amount: i128, address: Address, chain_address: &Address) {
        self.paid_gas = self.paid_gas.saturating_add(amount);
        if &address != chain_address {
            self.fee_target_address = Some(address);
        }
    }

    /// On halt: if `PaidGas < UsedGas` and genesis is established and not
    /// `DelayPayment`, fault.
    pub fn settle_on_halt(&self) -> Result<()> {
        if self.genesis_established && !self.delay_payment && self.paid_gas < self.used_gas {
            return Err(Error::UnpaidGasAtHalt {
                paid: self.paid_gas,
                used: self.used_gas,
            });
        }
        Ok(())
    }

    /// Snapshot/restore pair used for the bomb-contract gas rewind: the bomb
    /// contract is exempt, `UsedGas` is rewound around a bomb call.
    pub fn snapshot_used_gas(&self) -> i128 {
        self.used_gas
    }

    pub fn restore_used_gas(&mut self, snapshot: i128) {
        self.used_gas = snapshot;
    }

    /// Trigger gas propagation: on return, the parent's `UsedGas` absorbs the
    /// child's `UsedGas`.
    pub fn absorb_child(&mut self, child_used_gas: i128) {
        self.used_gas = self.used_gas.saturating_add(child_used_gas);
    }

    pub fn remaining(&self) -> i128 {
        self.max_gas - self.used_gas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::user([n; 33])
    }

    #[test]
    fn gas_free_before_genesis() {
        let mut meter = GasMeter::new(10, 1, false, false);
        for _ in 0..1000 {
            meter.validate_opcode(10).unwrap();
        }
        assert_eq!(meter.used_gas, 0);
    }

    #[test]
    fn faults_past_max_gas_once_genesis_established() {
        let mut meter = GasMeter::new(10, 1, true, false);
        meter.validate_opcode(5).unwrap();
        meter.validate_opcode(5).unwrap();
        assert!(meter.validate_opcode(1).is_err());
    }

    #[test]
    fn delay_payment_allows_exceeding_max_gas() {
        let mut meter = GasMeter::new(1, 1, true, false);
        meter.delay_payment = true;
        meter.validate_opcode(100).unwrap();
        assert_eq!(meter.used_gas, 100);
    }

    #[test]
    fn escrow_rejects_price_below_minimum_fee() {
        let mut meter = GasMeter::new(0, 5, true, false);
        assert!(meter.apply_gas_escrow(1, 100, addr(1)).is_err());
        assert!(meter.apply_gas_escrow(5, 100, addr(1)).is_ok());
    }

    #[test]
    fn unpaid_gas_faults_at_halt() {
        let mut meter = GasMeter::new(100, 1, true, false);
        meter.validate_opcode(40).unwrap();
        assert!(meter.settle_on_halt().is_err());
        meter.apply_gas_payment(40, addr(1), &addr(99));
        assert!(meter.settle_on_halt().is_ok());
    }

    #[test]
    fn trigger_child_has_delay_payment_set() {
        let meter = GasMeter::new(100, 1, true, false);
        let child = meter.child_for_trigger();
        assert!(child.delay_payment);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// For a transaction that halts successfully
        /// with genesis established and `DelayPayment = false`,
        /// `UsedGas <= MaxGas` and `PaidGas >= UsedGas`.
        #[test]
        fn halted_transaction_never_exceeds_max_gas(
            max_gas in 1i128..10_000,
            costs in proptest::collection::vec(0u64..50, 0..50),
        ) {
            let mut meter = GasMeter::new(max_gas, 1, true, false);
            let mut faulted = false;
            for cost in costs {
                if meter.validate_opcode(cost).is_err() {
                    faulted = true;
                    break;
                }
            }
            if !faulted {
                prop_assert!(meter.used_gas <= meter.max_gas);
                meter.apply_gas_payment(meter.used_gas, Address::user([1; 33]), &Address::user([1; 33]));
                prop_assert!(meter.settle_on_halt().is_ok());
                prop_assert!(meter.paid_gas >= meter.used_gas);
            }
        }
    }
}
