use ethers::types::{Address, Bytes, U256};

use gas_tank::{Call, CallOutcome, Error, Executor, GasTank};

/// Something the called contract does to the tank while it runs.
#[derive(Debug, Clone)]
pub enum Reentry {
    Deposit { account: Address, amount: U256 },
    Receive { sender: Address, value: U256 },
    Payout { caller: Address, accounts: Vec<Address> },
    Withdraw { caller: Address, account: Address },
    Execute { caller: Address, target: Address, data: Bytes },
}

/// Scripted execution environment.
#[derive(Debug)]
pub struct MockExecutor {
    pub gas_price: U256,
    pub gas_used: U256,
    pub success: bool,

    /// Transfers to these recipients are rejected.
    pub rejecting: Vec<Address>,

    /// Performed once, during the next forwarded call.
    pub reentry: Option<Reentry>,

    pub reentry_results: Vec<Result<(), Error>>,
    pub calls: Vec<Call>,
    pub transfers: Vec<(Address, U256)>,
}

impl MockExecutor {
    pub fn new(gas_price: U256, gas_used: U256) -> Self {
        Self {
            gas_price,
            gas_used,
            success: true,
            rejecting: Vec::new(),
            reentry: None,
            reentry_results: Vec::new(),
            calls: Vec::new(),
            transfers: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            success: false,
            ..Self::new(U256::one(), U256::zero())
        }
    }

    pub fn transferred_to(&self, recipient: Address) -> U256 {
        self.transfers
            .iter()
            .filter(|(to, _)| *to == recipient)
            .fold(U256::zero(), |total, (_, amount)| total + amount)
    }
}

impl Executor for MockExecutor {
    fn gas_price(&self) -> U256 {
        self.gas_price
    }

    fn call(&mut self, tank: &mut GasTank, call: &Call) -> CallOutcome {
        self.calls.push(call.clone());

        if let Some(reentry) = self.reentry.take() {
            let result = match reentry {
                Reentry::Deposit { account, amount } => tank.deposit(account, amount),
                Reentry::Receive { sender, value } => tank.receive(sender, value),
                Reentry::Payout { caller, accounts } => {
                    tank.payout(caller, &accounts, self).map(|_| ())
                }
                Reentry::Withdraw { caller, account } => {
                    tank.withdraw(caller, account, self).map(|_| ())
                }
                Reentry::Execute {
                    caller,
                    target,
                    data,
                } => tank.execute(caller, target, data, self).map(|_| ()),
            };
            self.reentry_results.push(result);
        }

        if self.success {
            CallOutcome::success(self.gas_used)
        } else {
            CallOutcome::failure(self.gas_used)
        }
    }

    fn transfer(&mut self, to: Address, amount: U256) -> bool {
        if self.rejecting.contains(&to) {
            return false;
        }
        self.transfers.push((to, amount));
        true
    }
}
