//! # hash-tools
//!
//! Tool registry and the built-in `hash` tool.

#![deny(unsafe_code)]

pub mod hash;
pub mod registry;

use std::sync::Arc;

use registry::ToolRegistry;

/// Create a [`ToolRegistry`] with all built-in tools.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(hash::HashTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_hash_tool() {
        let registry = create_default_registry();
        assert_eq!(registry.names(), vec!["hash".to_string()]);
    }
}
