//! Shared-module packaging of the reference problem.
//!
//! Hosts resolve [`getBrocker`] from this module and receive an owned
//! broker handle that casts to [`gridmin::plugin::BrokerKind::Problem`].

use gridmin::plugin::{self, BrokerHandle};

/// Factory symbol resolved by hosts. Ownership of the handle transfers to
/// the caller.
#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "C" fn getBrocker() -> *mut BrokerHandle {
    Box::into_raw(Box::new(plugin::problem_broker()))
}
