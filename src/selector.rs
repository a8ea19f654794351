use ethers::utils::id;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const EXEC_TRANSACTION_SIGNATURE: &str = "execTransaction(address,uint256,bytes,uint8,uint256,uint256,uint256,address,address,bytes)";
pub const EXECUTE_SIGNATURE: &str = "execute(address,bytes)";
pub const DEPOSIT_FOR_SIGNATURE: &str = "depositFor(address)";

/// Selector of `execTransaction` on a Safe, the default allowed method.
pub const EXEC_TRANSACTION: Selector = Selector([0x6a, 0x76, 0x12, 0x02]);

/// The leading four bytes of call data.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    pub fn from_signature(signature: &str) -> Selector {
        Selector(id(signature))
    }

    /// Returns `None` when `data` is shorter than a selector.
    pub fn of(data: &[u8]) -> Option<Selector> {
        data.get(..4)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .map(Selector)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorParseError {
    #[error("selector must be 4 bytes long, got `{0}`")]
    Length(String),

    #[error("selector is not hexadecimal: `{0}`")]
    Hex(String),
}

impl FromStr for Selector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 8 {
            return Err(SelectorParseError::Length(s.to_string()));
        }
        let value =
            u32::from_str_radix(digits, 16).map_err(|_| SelectorParseError::Hex(s.to_string()))?;
        Ok(Selector(value.to_be_bytes()))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Methods the tank knows how to forward. Anything else is carried as its
/// raw selector and is only forwarded when it is the configured allowed method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    ExecTransaction,
    Execute,
    DepositFor,
    Other(Selector),
}

impl Method {
    pub fn selector(&self) -> Selector {
        match self {
            Method::ExecTransaction => EXEC_TRANSACTION,
            Method::Execute => Selector::from_signature(EXECUTE_SIGNATURE),
            Method::DepositFor => Selector::from_signature(DEPOSIT_FOR_SIGNATURE),
            Method::Other(selector) => *selector,
        }
    }

    pub fn from_selector(selector: Selector) -> Method {
        [Method::ExecTransaction, Method::Execute, Method::DepositFor]
            .into_iter()
            .find(|method| method.selector() == selector)
            .unwrap_or(Method::Other(selector))
    }

    /// Decodes the method called by `data`.
    pub fn of(data: &[u8]) -> Option<Method> {
        Selector::of(data).map(Method::from_selector)
    }
}

impl From<Method> for Selector {
    fn from(method: Method) -> Selector {
        method.selector()
    }
}
