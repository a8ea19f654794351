//! Fee-charging relay path.
//!
//! A relayer forwards calls to wallets that prefunded the tank. Each relayed
//! call is charged to the wallet being called: the metered gas cost plus the
//! fixed `fee_per_call` surcharge. Only the tank's allowed method may be
//! relayed, unless the owner relays through the trusted path.

use ethers::types::{Address, Bytes, U256};
use tracing::trace;

use crate::error::Result;
use crate::meter::{Call, Executor, Metered};
use crate::tank::GasTank;

impl GasTank {
    /// Relays `data` to `target`, charging `target` for gas and the fee.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn relay<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        target: Address,
        data: Bytes,
        executor: &mut E,
    ) -> Result<Metered> {
        self.check_method(&data)?;
        trace!("{:?} is relaying a call to {:?}.", caller, target);
        let fee = self.config.fee_per_call;
        self.meter_and_forward(target, Call::new(target, data), fee, executor)
    }

    /// Owner-only relay that skips the method allow-list and the fee. The
    /// gas is still metered and charged to `target`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn relay_trusted<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        target: Address,
        data: Bytes,
        executor: &mut E,
    ) -> Result<Metered> {
        self.config.owner.require_owner(caller)?;
        self.meter_and_forward(target, Call::new(target, data), U256::zero(), executor)
    }

    /// What a relay consuming `gas_used` costs the relayed account: the
    /// configured `base_gas` counts as metered gas on top of `gas_used`, and
    /// `fee_per_call` is added after pricing.
    pub fn relay_cost(&self, gas_used: U256, gas_price: U256) -> Option<U256> {
        self.metered_cost(gas_used, gas_price, self.config.fee_per_call)
    }
}
