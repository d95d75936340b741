pub mod analysis;
pub mod artifacts;
pub mod classifier;
pub mod dataset;
pub mod execution;
pub mod memory;
pub mod plot;
pub mod queue;
pub mod storage;
pub mod submission;
pub mod vectorize;
pub mod worker;
