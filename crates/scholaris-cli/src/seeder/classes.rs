//! Class seeding. Classes are named `Grade N`, section `A`, and get a class
//! teacher from their school in rotation.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{Datelike, NaiveDate};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::SeedResult;
use super::models::ClassSeed;

const BATCH_SIZE: usize = 1000;

/// School years start in September: `2025-2026` runs Sep 2025 to Aug 2026.
pub fn academic_year(today: NaiveDate) -> String {
    let start = if today.month() >= 9 {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}-{}", start, start + 1)
}

pub fn generate_classes(
    school_ids: &[Uuid],
    per_school: usize,
    teachers_by_school: &HashMap<Uuid, Vec<Uuid>>,
    academic_year: &str,
) -> Vec<ClassSeed> {
    school_ids
        .iter()
        .flat_map(|school_id| {
            let teachers = teachers_by_school.get(school_id);
            (0..per_school).map(move |idx| ClassSeed {
                school_id: *school_id,
                name: format!("Grade {}", idx + 1),
                section: "A".to_string(),
                academic_year: academic_year.to_string(),
                class_teacher_id: teachers
                    .filter(|t| !t.is_empty())
                    .map(|t| t[idx % t.len()]),
            })
        })
        .collect()
}

/// Returns `(class_id, school_id)` for each seeded class.
pub async fn seed_classes(db: &PgPool, classes: &[ClassSeed]) -> SeedResult<Vec<(Uuid, Uuid)>> {
    let start_time = Instant::now();
    println!("📘 Seeding {} classes...", classes.len());

    let mut tx = db.begin().await?;
    let mut seeded = Vec::with_capacity(classes.len());

    for chunk in classes.chunks(BATCH_SIZE) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO classes (school_id, name, section, academic_year, class_teacher_id) ",
        );
        qb.push_values(chunk, |mut row, class| {
            row.push_bind(class.school_id)
                .push_bind(&class.name)
                .push_bind(&class.section)
                .push_bind(&class.academic_year)
                .push_bind(class.class_teacher_id);
        });
        qb.push(" RETURNING id");
        let ids = qb.build_query_scalar::<Uuid>().fetch_all(&mut *tx).await?;
        seeded.extend(ids.into_iter().zip(chunk.iter().map(|c| c.school_id)));
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} classes in {:?}",
        seeded.len(),
        start_time.elapsed()
    );

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_academic_year_turns_over_in_september() {
        assert_eq!(academic_year(date(2026, 8, 31)), "2025-2026");
        assert_eq!(academic_year(date(2026, 9, 1)), "2026-2027");
        assert_eq!(academic_year(date(2027, 1, 15)), "2026-2027");
    }

    #[test]
    fn test_generate_classes_rotates_teachers() {
        let school = Uuid::new_v4();
        let teachers = vec![Uuid::new_v4(), Uuid::new_v4()];
        let by_school = HashMap::from([(school, teachers.clone())]);

        let classes = generate_classes(&[school], 3, &by_school, "2026-2027");
        assert_eq!(classes.len(), 3);
        assert_eq!(classes[2].name, "Grade 3");
        assert_eq!(classes[0].class_teacher_id, Some(teachers[0]));
        assert_eq!(classes[1].class_teacher_id, Some(teachers[1]));
        assert_eq!(classes[2].class_teacher_id, Some(teachers[0]));
    }

    #[test]
    fn test_generate_classes_without_teachers() {
        let school = Uuid::new_v4();
        let classes = generate_classes(&[school], 2, &HashMap::new(), "2026-2027");
        assert!(classes.iter().all(|c| c.class_teacher_id.is_none()));
    }
}
