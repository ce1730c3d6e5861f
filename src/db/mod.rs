mod certificates;
#[cfg(test)]
mod memory;
mod models;

pub use certificates::{CertificateStore, PgCertificateStore, StoreError};
#[cfg(test)]
pub use memory::MemoryCertificateStore;
pub use models::*;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: &str,
    verification_token: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, role, is_verified, verification_token)
        VALUES ($1, $2, $3, $4, false, $5)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(verification_token)
    .fetch_one(pool)
    .await
}

/// Mark the user owning `token` as verified. Returns `false` for unknown tokens.
pub async fn verify_user_token(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_verified = true, verification_token = NULL
        WHERE verification_token = $1
        "#,
    )
    .bind(token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_admin(
    pool: &PgPool,
    username: &str,
    is_super_admin: bool,
) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = $1 AND is_super_admin = $2")
        .bind(username)
        .bind(is_super_admin)
        .fetch_optional(pool)
        .await
}

pub async fn create_admin(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    second_password_hash: Option<&str>,
    is_super_admin: bool,
) -> Result<Admin, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        r#"
        INSERT INTO admins (username, password_hash, second_password_hash, is_super_admin)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(second_password_hash)
    .bind(is_super_admin)
    .fetch_one(pool)
    .await
}

pub async fn create_course(
    pool: &PgPool,
    title: &str,
    description: Option<&str>,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "INSERT INTO courses (title, description) VALUES ($1, $2) RETURNING *",
    )
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn get_course_details(
    pool: &PgPool,
    course_id: i32,
) -> Result<Option<CourseDetails>, sqlx::Error> {
    let Some(course) = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let videos = sqlx::query_as::<_, Video>(
        "SELECT * FROM videos WHERE course_id = $1 ORDER BY created_at, id",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(CourseDetails { course, videos }))
}

pub async fn create_video(
    pool: &PgPool,
    course_id: i32,
    title: &str,
    video_url: &str,
) -> Result<Video, sqlx::Error> {
    sqlx::query_as::<_, Video>(
        r#"
        INSERT INTO videos (course_id, title, video_url)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(course_id)
    .bind(title)
    .bind(video_url)
    .fetch_one(pool)
    .await
}
