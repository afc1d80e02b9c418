// src/collab/mod.rs

//! Contract with the external collaborators: the task producer and the code
//! generator. Their output is untrusted; parsing yields either records or a
//! [`ParseFailure`] carrying the raw payload.

pub mod generator;
pub mod records;

pub use generator::{CommandGenerator, GenerateFuture, Generator, StagedGenerator};
pub use records::{
    FileRecord, ParseFailure, TaskRecord, parse_file_records, parse_task_records,
};
