//! Permission constants for the Scholaris API.
//!
//! Permissions are plain `resource:action` strings embedded in the access
//! token. Handlers check them through the `require_permission!` extractors so
//! a route never compares role names directly.
//!
//! # Example
//!
//! ```ignore
//! use scholaris_core::permissions;
//!
//! if auth_user.has_permission(permissions::NOTICES_CREATE) {
//!     // Publish notice
//! }
//! ```

// =============================================================================
// Schools permissions
// =============================================================================

pub const SCHOOLS_CREATE: &str = "schools:create";
pub const SCHOOLS_READ: &str = "schools:read";
pub const SCHOOLS_UPDATE: &str = "schools:update";
pub const SCHOOLS_DELETE: &str = "schools:delete";

// =============================================================================
// Users permissions
// =============================================================================

pub const USERS_CREATE: &str = "users:create";
pub const USERS_READ: &str = "users:read";
pub const USERS_UPDATE: &str = "users:update";
pub const USERS_DELETE: &str = "users:delete";

// =============================================================================
// Classes permissions
// =============================================================================

pub const CLASSES_CREATE: &str = "classes:create";
pub const CLASSES_READ: &str = "classes:read";
pub const CLASSES_UPDATE: &str = "classes:update";
pub const CLASSES_DELETE: &str = "classes:delete";

// =============================================================================
// Profile permissions (teachers, students, parents)
// =============================================================================

pub const TEACHERS_CREATE: &str = "teachers:create";
pub const TEACHERS_READ: &str = "teachers:read";
pub const TEACHERS_UPDATE: &str = "teachers:update";
pub const TEACHERS_DELETE: &str = "teachers:delete";

pub const STUDENTS_CREATE: &str = "students:create";
pub const STUDENTS_READ: &str = "students:read";
pub const STUDENTS_UPDATE: &str = "students:update";
pub const STUDENTS_DELETE: &str = "students:delete";

pub const PARENTS_CREATE: &str = "parents:create";
pub const PARENTS_READ: &str = "parents:read";
pub const PARENTS_UPDATE: &str = "parents:update";
pub const PARENTS_DELETE: &str = "parents:delete";

// =============================================================================
// Notices permissions
// =============================================================================

pub const NOTICES_CREATE: &str = "notices:create";
pub const NOTICES_READ: &str = "notices:read";
pub const NOTICES_UPDATE: &str = "notices:update";
pub const NOTICES_DELETE: &str = "notices:delete";

// =============================================================================
// Exams and results permissions
// =============================================================================

pub const EXAMS_CREATE: &str = "exams:create";
pub const EXAMS_READ: &str = "exams:read";
pub const EXAMS_UPDATE: &str = "exams:update";
pub const EXAMS_DELETE: &str = "exams:delete";

/// Permission to record or overwrite exam results
pub const RESULTS_WRITE: &str = "results:write";
pub const RESULTS_READ: &str = "results:read";

// =============================================================================
// Fees permissions
// =============================================================================

pub const FEES_CREATE: &str = "fees:create";
pub const FEES_READ: &str = "fees:read";
pub const FEES_UPDATE: &str = "fees:update";
pub const FEES_DELETE: &str = "fees:delete";
/// Permission to record a payment against a fee
pub const FEES_COLLECT: &str = "fees:collect";

// =============================================================================
// Attendance permissions
// =============================================================================

pub const ATTENDANCE_MARK: &str = "attendance:mark";
pub const ATTENDANCE_READ: &str = "attendance:read";
pub const ATTENDANCE_UPDATE: &str = "attendance:update";
pub const ATTENDANCE_DELETE: &str = "attendance:delete";

// =============================================================================
// Messages, audit and dashboard permissions
// =============================================================================

pub const MESSAGES_SEND: &str = "messages:send";
pub const MESSAGES_READ: &str = "messages:read";

pub const AUDIT_LOGS_READ: &str = "audit_logs:read";

pub const DASHBOARD_READ: &str = "dashboard:read";

/// Every permission known to the API.
pub const ALL: &[&str] = &[
    SCHOOLS_CREATE,
    SCHOOLS_READ,
    SCHOOLS_UPDATE,
    SCHOOLS_DELETE,
    USERS_CREATE,
    USERS_READ,
    USERS_UPDATE,
    USERS_DELETE,
    CLASSES_CREATE,
    CLASSES_READ,
    CLASSES_UPDATE,
    CLASSES_DELETE,
    TEACHERS_CREATE,
    TEACHERS_READ,
    TEACHERS_UPDATE,
    TEACHERS_DELETE,
    STUDENTS_CREATE,
    STUDENTS_READ,
    STUDENTS_UPDATE,
    STUDENTS_DELETE,
    PARENTS_CREATE,
    PARENTS_READ,
    PARENTS_UPDATE,
    PARENTS_DELETE,
    NOTICES_CREATE,
    NOTICES_READ,
    NOTICES_UPDATE,
    NOTICES_DELETE,
    EXAMS_CREATE,
    EXAMS_READ,
    EXAMS_UPDATE,
    EXAMS_DELETE,
    RESULTS_WRITE,
    RESULTS_READ,
    FEES_CREATE,
    FEES_READ,
    FEES_UPDATE,
    FEES_DELETE,
    FEES_COLLECT,
    ATTENDANCE_MARK,
    ATTENDANCE_READ,
    ATTENDANCE_UPDATE,
    ATTENDANCE_DELETE,
    MESSAGES_SEND,
    MESSAGES_READ,
    AUDIT_LOGS_READ,
    DASHBOARD_READ,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_permissions_are_unique() {
        let unique: HashSet<_> = ALL.iter().collect();
        assert_eq!(unique.len(), ALL.len());
    }

    #[test]
    fn test_permission_format() {
        for permission in ALL {
            let parts: Vec<&str> = permission.split(':').collect();
            assert_eq!(parts.len(), 2, "malformed permission {}", permission);
            assert!(!parts[0].is_empty() && !parts[1].is_empty());
        }
    }
}
