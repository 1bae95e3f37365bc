//! Provider gateway with ordered fallback.
//!
//! The `ProviderGateway` wraps a primary and a secondary decision provider,
//! applies the fixed system instruction and sampling temperature, bounds
//! each attempt with a timeout, and turns completion text into a JSON
//! object.

mod config;
mod provider_gateway;
mod response;

pub use config::{
    GatewayConfig, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    SYSTEM_INSTRUCTION,
};
pub use provider_gateway::{GatewayResponse, ProviderGateway, ProviderGatewayBuilder};
pub use response::{parse_payload, strip_code_fences};
