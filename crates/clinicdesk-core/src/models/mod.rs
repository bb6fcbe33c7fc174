//! Domain models for the clinic core.

mod appointment;
mod billing;
mod inventory;
mod patient;
mod records;
mod showcase;
mod team;

pub use appointment::*;
pub use billing::*;
pub use inventory::*;
pub use patient::*;
pub use records::*;
pub use showcase::*;
pub use team::*;
