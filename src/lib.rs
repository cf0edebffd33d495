pub mod metrics;
pub mod report;
pub mod snapshot;
pub mod table;
pub mod validate;

#[cfg(test)]
pub(crate) mod fixtures;
