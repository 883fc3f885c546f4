// src/services/mod.rs

pub mod assignment_ledger;
pub mod lifecycle;
pub mod progress;
pub mod question_bank;
pub mod result_store;
pub mod scoring;
pub mod session_store;
pub mod statistics;

pub use lifecycle::ExamService;
