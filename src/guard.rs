use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Holds the single privileged identifier of a tank.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(Address);

impl Owner {
    pub fn new(owner: Address) -> Owner {
        Owner(owner)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    pub fn require_owner(&self, caller: Address) -> Result<()> {
        if caller == self.0 {
            Ok(())
        } else {
            warn!("Rejected privileged call from {:?}.", caller);
            Err(Error::NotAuthorized { caller })
        }
    }

    pub fn change_owner(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.require_owner(caller)?;
        info!("Owner changed from {:?} to {:?}.", self.0, new_owner);
        self.0 = new_owner;
        Ok(())
    }
}
