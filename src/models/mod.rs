pub mod dataset;
pub mod job;
pub mod submission;
pub mod transaction;
