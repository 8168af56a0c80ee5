use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use scholaris_cli::seeder::{self, PerSchool, SeedConfig};
use scholaris_core::{UserRole, hash_password};
use sqlx::PgPool;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Parser)]
#[command(name = "scholaris-cli")]
#[command(about = "Scholaris CLI - Administrative tools for Scholaris", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a super administrator account
    CreateSuperAdmin {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake schools and their people
    Seed {
        #[arg(short = 's', long, default_value = "3")]
        schools: usize,

        /// School admins per school
        #[arg(long, default_value = "1")]
        admins: usize,

        /// Teachers per school
        #[arg(long, default_value = "6")]
        teachers: usize,

        /// Classes per school
        #[arg(long, default_value = "6")]
        classes: usize,

        /// Students per class
        #[arg(long, default_value = "20")]
        students: usize,

        /// Students sharing one parent account
        #[arg(long, default_value = "2")]
        children_per_parent: usize,
    },
    /// Clear all seeded data (keeps super admins and non-seeded schools)
    ClearSeed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let pool = scholaris_db::init_db_pool()
        .await
        .context("failed to connect to database")?;

    match cli.command {
        Commands::CreateSuperAdmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_super_admin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            schools,
            admins,
            teachers,
            classes,
            students,
            children_per_parent,
        } => {
            let config = SeedConfig::new(schools).with_per_school(PerSchool {
                admins,
                teachers,
                classes,
                students_per_class: students,
                children_per_parent,
            });
            seeder::seed_all(&pool, config)
                .await
                .map_err(|e| anyhow::anyhow!("error seeding database: {}", e))
        }
        Commands::ClearSeed => seeder::clear_all(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("error clearing seeded data: {}", e)),
    }
}

fn prompt(value: Option<String>, label: &str) -> anyhow::Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Input::new()
            .with_prompt(label)
            .interact_text()
            .with_context(|| format!("failed to read {}", label.to_lowercase())),
    }
}

async fn handle_create_super_admin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let first_name = prompt(first_name, "First name")?;
    let last_name = prompt(last_name, "Last name")?;
    let email = prompt(email, "Email address")?;

    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .context("failed to read password")?,
    };

    if !email.contains('@') {
        bail!("Invalid email address: {}", email);
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LENGTH);
    }

    create_super_admin(pool, &first_name, &last_name, &email, &password).await?;

    println!("\n✅ Super admin created successfully!");
    println!("   Email: {}", email);
    println!("   Name: {} {}", first_name, last_name);
    Ok(())
}

async fn create_super_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let hashed_password = hash_password(password).map_err(|e| e.error)?;

    let user_id = sqlx::query_scalar::<_, uuid::Uuid>(
        "INSERT INTO users (first_name, last_name, email, password, role, school_id)
         VALUES ($1, $2, $3, $4, $5, NULL)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email.to_lowercase())
    .bind(&hashed_password)
    .bind(UserRole::SuperAdmin)
    .fetch_optional(db)
    .await?;

    if user_id.is_none() {
        bail!("User with this email already exists");
    }

    Ok(())
}
