//! User roles and the permissions they grant.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::permissions::*;

/// The five roles of the system. Stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    SchoolAdmin,
    Teacher,
    Student,
    Parent,
}

const SUPER_ADMIN_PERMISSIONS: &[&str] = &[
    SCHOOLS_CREATE,
    SCHOOLS_READ,
    SCHOOLS_UPDATE,
    SCHOOLS_DELETE,
    USERS_CREATE,
    USERS_READ,
    USERS_UPDATE,
    USERS_DELETE,
    CLASSES_READ,
    TEACHERS_READ,
    STUDENTS_READ,
    PARENTS_READ,
    NOTICES_READ,
    EXAMS_READ,
    RESULTS_READ,
    FEES_READ,
    ATTENDANCE_READ,
    MESSAGES_SEND,
    MESSAGES_READ,
    AUDIT_LOGS_READ,
    DASHBOARD_READ,
];

const SCHOOL_ADMIN_PERMISSIONS: &[&str] = &[
    SCHOOLS_READ,
    SCHOOLS_UPDATE,
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

const TEACHER_PERMISSIONS: &[&str] = &[
    SCHOOLS_READ,
    CLASSES_READ,
    TEACHERS_READ,
    STUDENTS_READ,
    PARENTS_READ,
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
    ATTENDANCE_MARK,
    ATTENDANCE_READ,
    ATTENDANCE_UPDATE,
    ATTENDANCE_DELETE,
    MESSAGES_SEND,
    MESSAGES_READ,
    DASHBOARD_READ,
];

const STUDENT_PERMISSIONS: &[&str] = &[
    CLASSES_READ,
    STUDENTS_READ,
    NOTICES_READ,
    EXAMS_READ,
    RESULTS_READ,
    FEES_READ,
    ATTENDANCE_READ,
    MESSAGES_SEND,
    MESSAGES_READ,
    DASHBOARD_READ,
];

const PARENT_PERMISSIONS: &[&str] = &[
    CLASSES_READ,
    STUDENTS_READ,
    PARENTS_READ,
    NOTICES_READ,
    EXAMS_READ,
    RESULTS_READ,
    FEES_READ,
    ATTENDANCE_READ,
    MESSAGES_SEND,
    MESSAGES_READ,
    DASHBOARD_READ,
];

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::SchoolAdmin => "school_admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::Parent => "parent",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            UserRole::SuperAdmin => SUPER_ADMIN_PERMISSIONS,
            UserRole::SchoolAdmin => SCHOOL_ADMIN_PERMISSIONS,
            UserRole::Teacher => TEACHER_PERMISSIONS,
            UserRole::Student => STUDENT_PERMISSIONS,
            UserRole::Parent => PARENT_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }

    /// Only super admins live outside a school.
    pub fn requires_school(&self) -> bool {
        !matches!(self, UserRole::SuperAdmin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::SchoolAdmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(UserRole::SuperAdmin),
            "school_admin" => Ok(UserRole::SchoolAdmin),
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            "parent" => Ok(UserRole::Parent),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admins_and_teachers_create_notices() {
        assert!(UserRole::SchoolAdmin.has_permission(NOTICES_CREATE));
        assert!(UserRole::Teacher.has_permission(NOTICES_CREATE));
        assert!(!UserRole::SuperAdmin.has_permission(NOTICES_CREATE));
        assert!(!UserRole::Student.has_permission(NOTICES_CREATE));
        assert!(!UserRole::Parent.has_permission(NOTICES_CREATE));
    }

    #[test]
    fn test_schools_managed_by_super_admin() {
        assert!(UserRole::SuperAdmin.has_permission(SCHOOLS_CREATE));
        assert!(UserRole::SuperAdmin.has_permission(SCHOOLS_DELETE));
        assert!(!UserRole::SchoolAdmin.has_permission(SCHOOLS_CREATE));
        assert!(!UserRole::SchoolAdmin.has_permission(SCHOOLS_DELETE));
        assert!(UserRole::SchoolAdmin.has_permission(SCHOOLS_UPDATE));
    }

    #[test]
    fn test_every_role_reads_notices_and_dashboard() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::SchoolAdmin,
            UserRole::Teacher,
            UserRole::Student,
            UserRole::Parent,
        ] {
            assert!(role.has_permission(NOTICES_READ), "{}", role);
            assert!(role.has_permission(DASHBOARD_READ), "{}", role);
        }
    }

    #[test]
    fn test_role_permissions_are_known() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::SchoolAdmin,
            UserRole::Teacher,
            UserRole::Student,
            UserRole::Parent,
        ] {
            for permission in role.permissions() {
                assert!(ALL.contains(permission), "{} grants unknown {}", role, permission);
            }
        }
    }

    #[test]
    fn test_round_trip_through_str() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::SchoolAdmin,
            UserRole::Teacher,
            UserRole::Student,
            UserRole::Parent,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("janitor".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&UserRole::SchoolAdmin).unwrap();
        assert_eq!(json, "\"school_admin\"");
    }
}
