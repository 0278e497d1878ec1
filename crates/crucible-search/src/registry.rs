//! Re-exported from `crucible-adapters`, which owns the
//! [`AdapterRegistry`] contract since every other adapter consumer
//! (`crucible-sandbox`, `crucible-driver`) needs the same seam.

pub use crucible_adapters::AdapterRegistry;
