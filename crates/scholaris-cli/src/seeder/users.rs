//! Account seeding: school admins, teachers, parents and students.
//!
//! Every account row is inserted first and its profile row second, inside the
//! same transaction.

use chrono::NaiveDate;
use fake::Fake;
use fake::faker::name::en::*;
use fake::faker::phone_number::en::PhoneNumber;
use rayon::prelude::*;
use scholaris_core::UserRole;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;
use uuid::Uuid;

use super::SeedResult;
use super::models::{AccountSeed, ParentSeed, PerSchool, StudentSeed, TeacherSeed};

/// Seeded accounts use this email domain so they can be cleared later.
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

// 6 params per account
const BATCH_SIZE: usize = 1000;

const SUBJECTS: &[&str] = &[
    "Mathematics",
    "English",
    "Physics",
    "Chemistry",
    "Biology",
    "History",
    "Geography",
    "Computer Science",
];

fn email_local_part(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

pub fn generate_account(
    role: UserRole,
    school_id: Uuid,
    role_prefix: &str,
    run_tag: &str,
    idx: usize,
) -> AccountSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    let email = format!(
        "{}.{}+{}{}{}@{}",
        email_local_part(&first_name),
        email_local_part(&last_name),
        role_prefix,
        run_tag,
        idx,
        SEED_EMAIL_DOMAIN
    );

    AccountSeed {
        first_name,
        last_name,
        email,
        role,
        school_id,
    }
}

pub fn generate_admins(school_ids: &[Uuid], per_school: usize, run_tag: &str) -> Vec<AccountSeed> {
    (0..school_ids.len() * per_school)
        .into_par_iter()
        .map(|i| generate_account(UserRole::SchoolAdmin, school_ids[i / per_school], "admin", run_tag, i))
        .collect()
}

pub fn generate_teachers(school_ids: &[Uuid], per_school: usize, run_tag: &str) -> Vec<TeacherSeed> {
    (0..school_ids.len() * per_school)
        .into_par_iter()
        .map(|i| TeacherSeed {
            account: generate_account(
                UserRole::Teacher,
                school_ids[i / per_school],
                "teacher",
                run_tag,
                i,
            ),
            employee_number: format!("T{:04}", i % per_school + 1),
            subject_specialization: SUBJECTS[i % SUBJECTS.len()].to_string(),
        })
        .collect()
}

/// Parents and students for each `(class_id, school_id)`.
///
/// Students of a class are handed out to that class's parents in runs of
/// `children_per_parent`; `parent_slot` indexes the returned parents.
pub fn generate_families(
    classes: &[(Uuid, Uuid)],
    per_school: &PerSchool,
    run_tag: &str,
) -> (Vec<ParentSeed>, Vec<StudentSeed>) {
    let parents_per_class = per_school.parents_per_class();
    let students_per_class = per_school.students_per_class;
    let children_per_parent = per_school.children_per_parent.max(1);

    let parents = (0..classes.len() * parents_per_class)
        .into_par_iter()
        .map(|i| {
            let (_, school_id) = classes[i / parents_per_class];
            ParentSeed {
                account: generate_account(UserRole::Parent, school_id, "parent", run_tag, i),
                phone: PhoneNumber().fake(),
            }
        })
        .collect();

    let students = (0..classes.len() * students_per_class)
        .into_par_iter()
        .map(|i| {
            let class_idx = i / students_per_class;
            let (class_id, school_id) = classes[class_idx];
            let within_class = i % students_per_class;
            let year = (2008..2019).fake::<i32>();
            let month = (1..13).fake::<u32>();
            let day = (1..29).fake::<u32>();

            StudentSeed {
                account: generate_account(UserRole::Student, school_id, "student", run_tag, i),
                admission_number: format!("ADM-{}-{:05}", run_tag, i + 1),
                class_id,
                parent_slot: class_idx * parents_per_class + within_class / children_per_parent,
                date_of_birth: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
                gender: if i % 2 == 0 { "female" } else { "male" },
            }
        })
        .collect();

    (parents, students)
}

async fn insert_accounts(
    tx: &mut Transaction<'_, Postgres>,
    accounts: &[&AccountSeed],
    password_hash: &str,
) -> SeedResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(accounts.len());

    for chunk in accounts.chunks(BATCH_SIZE) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO users (first_name, last_name, email, password, role, school_id) ",
        );
        qb.push_values(chunk, |mut row, account| {
            row.push_bind(&account.first_name)
                .push_bind(&account.last_name)
                .push_bind(&account.email)
                .push_bind(password_hash)
                .push_bind(account.role)
                .push_bind(account.school_id);
        });
        qb.push(" RETURNING id");
        ids.extend(qb.build_query_scalar::<Uuid>().fetch_all(&mut **tx).await?);
    }

    Ok(ids)
}

pub async fn seed_admins(
    db: &PgPool,
    admins: &[AccountSeed],
    password_hash: &str,
) -> SeedResult<Vec<Uuid>> {
    let start_time = Instant::now();
    println!("🧑‍💼 Seeding {} school admins...", admins.len());

    let mut tx = db.begin().await?;
    let refs: Vec<&AccountSeed> = admins.iter().collect();
    let ids = insert_accounts(&mut tx, &refs, password_hash).await?;
    tx.commit().await?;

    println!("   ✓ Inserted {} admins in {:?}", ids.len(), start_time.elapsed());
    Ok(ids)
}

/// Returns `(teacher_id, school_id)` for each seeded teacher.
pub async fn seed_teachers(
    db: &PgPool,
    teachers: &[TeacherSeed],
    password_hash: &str,
) -> SeedResult<Vec<(Uuid, Uuid)>> {
    let start_time = Instant::now();
    println!("👩‍🏫 Seeding {} teachers...", teachers.len());

    let mut tx = db.begin().await?;
    let refs: Vec<&AccountSeed> = teachers.iter().map(|t| &t.account).collect();
    let user_ids = insert_accounts(&mut tx, &refs, password_hash).await?;

    let rows: Vec<(Uuid, &TeacherSeed)> = user_ids.into_iter().zip(teachers).collect();
    let mut seeded = Vec::with_capacity(rows.len());
    for chunk in rows.chunks(BATCH_SIZE) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO teachers (user_id, school_id, employee_number, subject_specialization) ",
        );
        qb.push_values(chunk, |mut row, (user_id, teacher)| {
            row.push_bind(*user_id)
                .push_bind(teacher.account.school_id)
                .push_bind(&teacher.employee_number)
                .push_bind(&teacher.subject_specialization);
        });
        qb.push(" RETURNING id");
        let ids = qb.build_query_scalar::<Uuid>().fetch_all(&mut *tx).await?;
        seeded.extend(
            ids.into_iter()
                .zip(chunk.iter().map(|(_, t)| t.account.school_id)),
        );
    }

    tx.commit().await?;

    println!("   ✓ Inserted {} teachers in {:?}", seeded.len(), start_time.elapsed());
    Ok(seeded)
}

/// Inserts parents, then students linked to them by `parent_slot`.
pub async fn seed_families(
    db: &PgPool,
    parents: &[ParentSeed],
    students: &[StudentSeed],
    password_hash: &str,
) -> SeedResult<()> {
    let start_time = Instant::now();
    println!(
        "👪 Seeding {} parents and {} students...",
        parents.len(),
        students.len()
    );

    let mut tx = db.begin().await?;

    let refs: Vec<&AccountSeed> = parents.iter().map(|p| &p.account).collect();
    let user_ids = insert_accounts(&mut tx, &refs, password_hash).await?;
    let rows: Vec<(Uuid, &ParentSeed)> = user_ids.into_iter().zip(parents).collect();
    let mut parent_ids = Vec::with_capacity(rows.len());
    for chunk in rows.chunks(BATCH_SIZE) {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO parents (user_id, school_id, phone) ");
        qb.push_values(chunk, |mut row, (user_id, parent)| {
            row.push_bind(*user_id)
                .push_bind(parent.account.school_id)
                .push_bind(&parent.phone);
        });
        qb.push(" RETURNING id");
        parent_ids.extend(qb.build_query_scalar::<Uuid>().fetch_all(&mut *tx).await?);
    }

    let refs: Vec<&AccountSeed> = students.iter().map(|s| &s.account).collect();
    let user_ids = insert_accounts(&mut tx, &refs, password_hash).await?;
    let rows: Vec<(Uuid, &StudentSeed)> = user_ids.into_iter().zip(students).collect();
    for chunk in rows.chunks(BATCH_SIZE) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO students (user_id, school_id, admission_number, class_id, parent_id, date_of_birth, gender) ",
        );
        qb.push_values(chunk, |mut row, (user_id, student)| {
            row.push_bind(*user_id)
                .push_bind(student.account.school_id)
                .push_bind(&student.admission_number)
                .push_bind(student.class_id)
                .push_bind(parent_ids.get(student.parent_slot).copied())
                .push_bind(student.date_of_birth)
                .push_bind(student.gender);
        });
        qb.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    println!("   ✓ Inserted families in {:?}", start_time.elapsed());
    Ok(())
}

/// Deletes seeded accounts left outside seeded schools. Super admins stay.
pub async fn clear_users(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let deleted = sqlx::query("DELETE FROM users WHERE email LIKE $1 AND role <> 'super_admin'")
        .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        deleted,
        start_time.elapsed()
    );

    Ok(deleted)
}
