use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{decode_json, encode_json, DbError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdventureWorld {
    pub deficit_area: String,
    pub world_number: i64,
    pub world_name: String,
    pub color: String,
    #[serde(default)]
    pub game_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdventureThemeConfig {
    pub primary_interest: String,
    pub color_palette: String,
    pub decoration_style: String,
}

impl Default for AdventureThemeConfig {
    fn default() -> Self {
        Self {
            primary_interest: String::new(),
            color_palette: "default".to_string(),
            decoration_style: "nature".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdventureMap {
    pub id: String,
    pub student_id: String,
    pub created_by: Option<String>,
    pub title: String,
    pub worlds: Vec<AdventureWorld>,
    pub theme_config: AdventureThemeConfig,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdventureStatus {
    pub has_adventure: bool,
    pub adventure_id: String,
    pub title: String,
    pub world_count: usize,
    pub total_games: usize,
}

fn adventure_from_row(row: &SqliteRow) -> Result<AdventureMap, DbError> {
    // Theme config is cosmetic; a broken value falls back to the default theme.
    let theme_raw: Option<String> = row.try_get("theme_config")?;
    let theme_config = theme_raw
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default();

    Ok(AdventureMap {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        created_by: row.try_get("created_by")?,
        title: row.try_get("title")?,
        worlds: decode_json("worlds", row.try_get("worlds")?)?,
        theme_config,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Inserts a new active map after archiving the student's current ones
pub async fn create_adventure(pool: &SqlitePool, map: &AdventureMap) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"UPDATE "adventure_maps" SET "status" = 'archived' WHERE "student_id" = ? AND "status" = 'active'"#,
    )
    .bind(&map.student_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO "adventure_maps" (
            "id", "student_id", "created_by", "title", "worlds", "theme_config",
            "status", "created_at", "updated_at"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&map.id)
    .bind(&map.student_id)
    .bind(&map.created_by)
    .bind(&map.title)
    .bind(encode_json("worlds", &map.worlds)?)
    .bind(encode_json("theme_config", &map.theme_config)?)
    .bind(&map.status)
    .bind(&map.created_at)
    .bind(&map.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn get_adventure(pool: &SqlitePool, adventure_id: &str) -> Result<Option<AdventureMap>, DbError> {
    let row = sqlx::query(r#"SELECT * FROM "adventure_maps" WHERE "id" = ?"#)
        .bind(adventure_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(adventure_from_row).transpose()
}

pub async fn get_active_adventure(pool: &SqlitePool, student_id: &str) -> Result<Option<AdventureMap>, DbError> {
    let row = sqlx::query(
        r#"
        SELECT * FROM "adventure_maps"
        WHERE "student_id" = ? AND "status" = 'active'
        ORDER BY "updated_at" DESC LIMIT 1
        "#,
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(adventure_from_row).transpose()
}

pub async fn list_student_adventures(pool: &SqlitePool, student_id: &str) -> Result<Vec<AdventureMap>, DbError> {
    let rows = sqlx::query(
        r#"SELECT * FROM "adventure_maps" WHERE "student_id" = ? ORDER BY "updated_at" DESC"#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(adventure_from_row).collect()
}

/// Summary of every student that currently has an active map
pub async fn active_adventure_statuses(pool: &SqlitePool) -> Result<BTreeMap<String, AdventureStatus>, DbError> {
    let rows = sqlx::query(
        r#"SELECT "student_id", "id", "title", "worlds" FROM "adventure_maps" WHERE "status" = 'active'"#,
    )
    .fetch_all(pool)
    .await?;

    let mut statuses = BTreeMap::new();
    for row in &rows {
        let worlds: Vec<AdventureWorld> = decode_json("worlds", row.try_get("worlds")?)?;
        let student_id: String = row.try_get("student_id")?;
        statuses.insert(
            student_id,
            AdventureStatus {
                has_adventure: true,
                adventure_id: row.try_get("id")?,
                title: row.try_get("title")?,
                world_count: worlds.len(),
                total_games: worlds.iter().map(|w| w.game_ids.len()).sum(),
            },
        );
    }
    Ok(statuses)
}

pub async fn update_adventure(pool: &SqlitePool, map: &AdventureMap) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE "adventure_maps"
        SET "title" = ?, "worlds" = ?, "theme_config" = ?, "status" = ?, "updated_at" = ?
        WHERE "id" = ?
        "#,
    )
    .bind(&map.title)
    .bind(encode_json("worlds", &map.worlds)?)
    .bind(encode_json("theme_config", &map.theme_config)?)
    .bind(&map.status)
    .bind(&map.updated_at)
    .bind(&map.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_adventure(pool: &SqlitePool, adventure_id: &str) -> Result<bool, DbError> {
    let affected = sqlx::query(r#"DELETE FROM "adventure_maps" WHERE "id" = ?"#)
        .bind(adventure_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}
