//! Database seeding for development and load testing.
//!
//! Creates schools and, inside each, school admins, teachers, classes,
//! parents and students. Every seeded account shares [`SEED_PASSWORD`].
//!
//! # Module Structure
//!
//! - [`schools`] - School generation and insertion
//! - [`classes`] - Classes with rotating class teachers
//! - [`users`] - Accounts and their teacher, parent and student profiles
//! - [`models`] - Seed rows and run configuration
//!
//! # Performance
//!
//! - Parallel data generation using Rayon
//! - Batch inserts through `QueryBuilder::push_values`
//! - Single bcrypt hash reused for all accounts (cost 4 for speed)

pub mod classes;
pub mod models;
pub mod schools;
pub mod users;

pub use models::{PerSchool, SeedConfig};

use std::collections::HashMap;
use std::time::Instant;

use sqlx::PgPool;
use uuid::Uuid;

pub type SeedResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub const SEED_PASSWORD: &str = "Password123!";

const SEED_HASH_COST: u32 = 4;

fn hash_seed_password() -> SeedResult<String> {
    Ok(bcrypt::hash(SEED_PASSWORD, SEED_HASH_COST)?)
}

/// Short tag that keeps emails and codes of repeated runs apart.
fn run_tag() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> SeedResult<()> {
    let start_time = Instant::now();
    let per_school = &config.per_school;

    println!("🌱 Starting database seeding...");
    println!("   - Schools: {}", config.num_schools);
    println!(
        "   - Per school: {} admins, {} teachers, {} classes, {} parents, {} students",
        per_school.admins,
        per_school.teachers,
        per_school.classes,
        per_school.parents(),
        per_school.students()
    );

    let password_hash = hash_seed_password()?;
    let tag = run_tag();

    let school_ids = schools::seed_schools(db, config.num_schools, &tag).await?;

    let admins = users::generate_admins(&school_ids, per_school.admins, &tag);
    users::seed_admins(db, &admins, &password_hash).await?;

    let teachers = users::generate_teachers(&school_ids, per_school.teachers, &tag);
    let teacher_ids = users::seed_teachers(db, &teachers, &password_hash).await?;

    let mut teachers_by_school: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (teacher_id, school_id) in teacher_ids {
        teachers_by_school.entry(school_id).or_default().push(teacher_id);
    }

    let year = classes::academic_year(chrono::Utc::now().date_naive());
    let class_seeds =
        classes::generate_classes(&school_ids, per_school.classes, &teachers_by_school, &year);
    let class_ids = classes::seed_classes(db, &class_seeds).await?;

    let (parents, students) = users::generate_families(&class_ids, per_school, &tag);
    users::seed_families(db, &parents, &students, &password_hash).await?;

    println!(
        "\n✅ Seeded {} accounts in {:?}",
        config.total_accounts(),
        start_time.elapsed()
    );
    println!("   Every seeded account uses the password: {}", SEED_PASSWORD);

    Ok(())
}

/// Removes seeded schools and any seeded accounts left behind.
pub async fn clear_all(db: &PgPool) -> SeedResult<()> {
    let start_time = Instant::now();
    println!("🧹 Clearing seeded data...");

    schools::clear_schools(db).await?;
    users::clear_users(db).await?;

    println!("\n✅ Cleared seeded data in {:?}", start_time.elapsed());
    Ok(())
}
