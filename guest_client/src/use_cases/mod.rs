// Use cases layer: local quota cache, reconciliation, guest identity and the gate.

pub mod gate;
pub mod identity;
pub mod quota_cache;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;
