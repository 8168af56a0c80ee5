//! School seeding.

use fake::Fake;
use fake::faker::address::en::*;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Instant;
use uuid::Uuid;

use super::SeedResult;
use super::models::SchoolSeed;

/// Seeded schools carry this code prefix so they can be cleared later.
pub const SEED_CODE_PREFIX: &str = "SEED-";

const BATCH_SIZE: usize = 500;

/// Generates school data in parallel using Rayon
pub fn generate_schools(count: usize, run_tag: &str) -> Vec<SchoolSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let state: String = StateAbbr().fake();
            let zip: String = ZipCode().fake();
            let code = format!("{}{}-{:03}", SEED_CODE_PREFIX, run_tag, idx + 1);

            SchoolSeed {
                name: format!("{} Academy {}", city, code),
                code,
                address: format!("{} {}, {}, {} {}", building, street, city, state, zip),
            }
        })
        .collect()
}

pub async fn seed_schools(db: &PgPool, count: usize, run_tag: &str) -> SeedResult<Vec<Uuid>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} schools...", count);

    let schools = generate_schools(count, run_tag);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(schools.len());

    for chunk in schools.chunks(BATCH_SIZE) {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO schools (name, code, address) ");
        qb.push_values(chunk, |mut row, school| {
            row.push_bind(&school.name)
                .push_bind(&school.code)
                .push_bind(&school.address);
        });
        qb.push(" RETURNING id");
        ids.extend(
            qb.build_query_scalar::<Uuid>()
                .fetch_all(&mut *tx)
                .await?,
        );
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} schools in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids)
}

/// Deletes seeded schools. Their users and records go with them.
pub async fn clear_schools(db: &PgPool) -> SeedResult<u64> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded schools...");

    let deleted = sqlx::query("DELETE FROM schools WHERE code LIKE $1")
        .bind(format!("{}%", SEED_CODE_PREFIX))
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} schools in {:?}",
        deleted,
        start_time.elapsed()
    );

    Ok(deleted)
}
