#![forbid(unsafe_code)]

pub mod bank_file;
pub mod repository;

pub use bank_file::{load_banks, parse_banks, seed_banks};
pub use repository::{
    AttemptRecord, AttemptRepository, InMemoryRepository, QuestionBank, QuestionBankRepository,
    Storage, StorageError,
};
