pub mod attendance;
pub mod backup_exchange;
pub mod core;
pub mod sections;
pub mod students;
pub mod subjects;
