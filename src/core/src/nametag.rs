//! Name-tag address resolution.
//!
//! A name-tag token is an ordinary token whose current state data is the
//! UTF-8 string of the address it stands for. `NAMETAG://` addresses name such
//! a token by id; resolving follows the chain until a non-name-tag address.

use crate::address::Address;
use crate::errors::CoreError;
use crate::token::Token;
use crate::types::TokenId;
use std::collections::HashSet;
use tracing::debug;

/// Finds a name-tag token by id, searching nested name-tag tokens too.
pub fn find_nametag<'a>(token_id: &TokenId, nametag_tokens: &'a [Token]) -> Option<&'a Token> {
    for token in nametag_tokens {
        if token.id() == token_id {
            return Some(token);
        }
        if let Some(found) = find_nametag(token_id, token.nametag_tokens()) {
            return Some(found);
        }
    }
    None
}

/// The address a name-tag token currently points to.
pub fn nametag_target(token: &Token) -> Result<Address, CoreError> {
    let text = std::str::from_utf8(token.state().data()).map_err(|_| {
        CoreError::InvalidAddress(format!("name tag {} does not hold a UTF-8 address", token.id()))
    })?;
    text.parse()
}

/// Resolves an address through name-tag tokens.
///
/// Non-name-tag addresses are returned unchanged.
pub fn resolve_address(address: &Address, nametag_tokens: &[Token]) -> Result<Address, CoreError> {
    let mut visited = HashSet::new();
    let mut current = address.clone();

    while let Address::NameTag(token_id) = current {
        if !visited.insert(token_id) {
            return Err(CoreError::NametagCycle(token_id.to_hex()));
        }

        let token = find_nametag(&token_id, nametag_tokens)
            .ok_or_else(|| CoreError::NametagNotFound(token_id.to_hex()))?;

        current = nametag_target(token)?;
        debug!("Name tag {} resolves to {}", token_id, current);
    }

    Ok(current)
}
