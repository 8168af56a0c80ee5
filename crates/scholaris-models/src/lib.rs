//! # Scholaris Models
//!
//! Domain models and DTOs for the Scholaris API: database rows, request
//! bodies with their validation rules, filter parameters and the
//! paginated response envelopes.
//!
//! A few pure domain rules live next to the types they govern so they can
//! be unit tested without a database:
//!
//! - [`notices::NoticeAudience::visible_to`]: which audiences a role sees
//! - [`exams::compute_grade`]: letter grade from marks
//! - [`fees::FeeStatus::derive`]: fee status from paid amount and due date
//! - [`attendance::AttendanceSummary::from_counts`]: attendance rate
//!
//! # Example
//!
//! ```ignore
//! use scholaris_models::notices::{NoticeAudience, CreateNoticeDto};
//! use scholaris_core::UserRole;
//!
//! let audiences = NoticeAudience::visible_to(UserRole::Student);
//! assert_eq!(audiences, vec![NoticeAudience::All, NoticeAudience::Students]);
//! ```

pub mod attendance;
pub mod audit;
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

pub use schools::{School, SchoolSummary};
pub use users::User;
