//! Hard policy constraints applied around the provider call.
//!
//! Permission checks run before the call and can refuse a node outright.
//! The override pass runs after it and can only lower or cancel a scan.

mod overrides;
mod permissions;

pub use overrides::{
    apply_overrides, apply_overrides_at, AppliedOverride, OverrideContext, OverrideReport,
    OverrideRule,
};
pub use permissions::check_permissions;
