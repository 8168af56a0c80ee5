//! Feature modules. Each one exposes a `controller`, a `service` holding the
//! SQL and business rules, and a `router` mounted under `/api`.

pub mod attendance;
pub mod audit_logs;
pub mod auth;
pub mod classes;
pub mod dashboard;
pub mod exams;
pub mod fees;
pub mod messages;
pub mod notices;
pub mod parents;
pub mod schools;
pub mod students;
pub mod teachers;
pub mod users;
