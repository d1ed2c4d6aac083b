use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };

use crate::error::AppError;

// ─── TokenKind ───────────────────────────────────────────────────────

/// Discriminant stored in the `tokens.kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    SubstrateNative,
    SubstrateOrml,
    EvmNative,
    EvmErc20,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::SubstrateNative => "substrate-native",
            TokenKind::SubstrateOrml => "substrate-orml",
            TokenKind::EvmNative => "evm-native",
            TokenKind::EvmErc20 => "evm-erc20",
        }
    }

    pub fn all() -> &'static [TokenKind] {
        &[
            TokenKind::SubstrateNative,
            TokenKind::SubstrateOrml,
            TokenKind::EvmNative,
            TokenKind::EvmErc20,
        ]
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenKind::all()
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown token kind: {}", s)))
    }
}

// ─── RpcProtocol ─────────────────────────────────────────────────────

/// Which JSON-RPC dialect an endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcProtocol {
    Substrate,
    Ethereum,
}

impl fmt::Display for RpcProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcProtocol::Substrate => f.write_str("substrate"),
            RpcProtocol::Ethereum => f.write_str("ethereum"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_round_trip() {
        for kind in TokenKind::all() {
            assert_eq!(kind.as_str().parse::<TokenKind>().unwrap(), *kind);
        }
        assert!("substrate-assets".parse::<TokenKind>().is_err());
    }
}
