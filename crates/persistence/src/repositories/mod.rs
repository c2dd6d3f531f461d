//! Repository implementations for database operations.

pub mod participant;
pub mod scan;

pub use participant::ParticipantRepository;
pub use scan::ScanRepository;
