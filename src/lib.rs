//! Fraud Analysis Job Service
//!
//! This library provides the core of the fraud-jobs system: clients submit
//! asynchronous analysis jobs (feature-distribution plots or fraud
//! classification of transaction batches), Redis-backed workers execute them,
//! and results are fetched once a job completes.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
