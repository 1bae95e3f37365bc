//! Permission pre-checks run before any provider is contacted.

use crate::core::{Node, Organisation, PermissionDeniedError};

/// Checks that `organisation` permits scanning `node` at all.
///
/// The blacklist is checked first. Hosts match exactly. The protocol
/// whitelist applies only when it is non-empty and the node has a protocol.
///
/// # Errors
///
/// Returns `PermissionDeniedError` naming the rule that forbids the node.
pub fn check_permissions(
    node: &Node,
    organisation: &Organisation,
) -> Result<(), PermissionDeniedError> {
    if organisation.blacklisted_hosts.contains(&node.host) {
        return Err(PermissionDeniedError::BlacklistedHost {
            host: node.host.clone(),
            organisation: organisation.id.clone(),
        });
    }

    if let Some(protocol) = &node.protocol {
        if !organisation.whitelisted_protocols.is_empty()
            && !organisation.whitelisted_protocols.contains(protocol)
        {
            return Err(PermissionDeniedError::ProtocolNotWhitelisted {
                protocol: protocol.clone(),
                organisation: organisation.id.clone(),
            });
        }
    }

    Ok(())
}
