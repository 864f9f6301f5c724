//! Contract tests for the semantic core.

mod binder_contract;
mod mapping_contract;
