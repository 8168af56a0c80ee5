//! Seed rows and the configuration that sizes a seeding run.

use chrono::NaiveDate;
use scholaris_core::UserRole;
use uuid::Uuid;

/// Seed data for creating a school.
pub struct SchoolSeed {
    pub name: String,
    pub code: String,
    pub address: String,
}

/// Seed data for a login account. Profiles are inserted after the account.
pub struct AccountSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    pub school_id: Uuid,
}

pub struct TeacherSeed {
    pub account: AccountSeed,
    pub employee_number: String,
    pub subject_specialization: String,
}

pub struct ClassSeed {
    pub school_id: Uuid,
    pub name: String,
    pub section: String,
    pub academic_year: String,
    pub class_teacher_id: Option<Uuid>,
}

pub struct ParentSeed {
    pub account: AccountSeed,
    pub phone: String,
}

pub struct StudentSeed {
    pub account: AccountSeed,
    pub admission_number: String,
    pub class_id: Uuid,
    /// Index into the parents generated for the same class.
    pub parent_slot: usize,
    pub date_of_birth: NaiveDate,
    pub gender: &'static str,
}

/// Sizes of everything created inside each school.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerSchool {
    pub admins: usize,
    pub teachers: usize,
    pub classes: usize,
    pub students_per_class: usize,
    /// Students sharing one parent account.
    pub children_per_parent: usize,
}

impl Default for PerSchool {
    fn default() -> Self {
        Self {
            admins: 1,
            teachers: 6,
            classes: 6,
            students_per_class: 20,
            children_per_parent: 2,
        }
    }
}

impl PerSchool {
    pub fn students(&self) -> usize {
        self.classes * self.students_per_class
    }

    pub fn parents_per_class(&self) -> usize {
        let per_parent = self.children_per_parent.max(1);
        self.students_per_class.div_ceil(per_parent)
    }

    pub fn parents(&self) -> usize {
        self.classes * self.parents_per_class()
    }

    pub fn accounts(&self) -> usize {
        self.admins + self.teachers + self.parents() + self.students()
    }
}

/// Complete configuration for database seeding.
#[derive(Clone, Debug, Default)]
pub struct SeedConfig {
    pub num_schools: usize,
    pub per_school: PerSchool,
}

impl SeedConfig {
    pub fn new(num_schools: usize) -> Self {
        Self {
            num_schools,
            ..Default::default()
        }
    }

    pub fn with_per_school(mut self, per_school: PerSchool) -> Self {
        self.per_school = per_school;
        self
    }

    pub fn total_accounts(&self) -> usize {
        self.num_schools * self.per_school.accounts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes() {
        let per_school = PerSchool::default();
        assert_eq!(per_school.students(), 120);
        assert_eq!(per_school.parents_per_class(), 10);
        assert_eq!(per_school.parents(), 60);
        assert_eq!(per_school.accounts(), 1 + 6 + 60 + 120);
    }

    #[test]
    fn test_odd_class_rounds_parents_up() {
        let per_school = PerSchool {
            students_per_class: 5,
            children_per_parent: 2,
            ..Default::default()
        };
        assert_eq!(per_school.parents_per_class(), 3);
    }

    #[test]
    fn test_zero_children_per_parent_means_one_each() {
        let per_school = PerSchool {
            students_per_class: 4,
            children_per_parent: 0,
            ..Default::default()
        };
        assert_eq!(per_school.parents_per_class(), 4);
    }

    #[test]
    fn test_total_accounts() {
        let config = SeedConfig::new(2).with_per_school(PerSchool {
            admins: 1,
            teachers: 2,
            classes: 1,
            students_per_class: 2,
            children_per_parent: 2,
        });
        assert_eq!(config.total_accounts(), 2 * (1 + 2 + 1 + 2));
    }
}
