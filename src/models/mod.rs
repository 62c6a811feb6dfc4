pub mod hunt;
pub mod scan_event;
pub mod submission;
pub mod ticket;
