// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Pattern Repository
//!
//! Production `PatternRepository` backed by the `patterns` and
//! `pattern_links` tables (see `cortex/migrations/`). Updates are guarded by
//! `WHERE revision = $expected`, so several daemons may share one database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::link::Link;
use crate::domain::pattern::Pattern;
use crate::domain::repository::{PatternQuery, PatternRepository, StoreStats};
use crate::domain::{Outcome, StoreError};

const PATTERN_COLUMNS: &str =
    "name, classification, reason, confidence, occurrences, domain, created_at, last_seen, revision";

const LINK_COLUMNS: &str = "source, target, strength, created_at, updated_at, revision";

pub struct PostgresPatternRepository {
    pool: PgPool,
}

impl PostgresPatternRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to apply migrations: {}", e)))
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn pattern_from_row(row: &PgRow) -> Result<Pattern, StoreError> {
    let classification: String = row.try_get("classification")?;
    let classification: Outcome = classification
        .parse()
        .map_err(|e: crate::domain::CortexError| StoreError::Serialization(e.to_string()))?;

    Ok(Pattern {
        name: row.try_get("name")?,
        classification,
        reason: row.try_get("reason")?,
        confidence: row.try_get("confidence")?,
        occurrences: to_u64(row.try_get("occurrences")?),
        domain: row.try_get("domain")?,
        created_at: row.try_get("created_at")?,
        last_seen: row.try_get("last_seen")?,
        revision: to_u64(row.try_get("revision")?),
    })
}

fn link_from_row(row: &PgRow) -> Result<Link, StoreError> {
    Ok(Link {
        source: row.try_get("source")?,
        target: row.try_get("target")?,
        strength: row.try_get("strength")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        revision: to_u64(row.try_get("revision")?),
    })
}

#[async_trait]
impl PatternRepository for PostgresPatternRepository {
    async fn insert_pattern(&self, pattern: &Pattern) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO patterns (
                name, classification, reason, confidence, occurrences,
                domain, created_at, last_seen, revision
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&pattern.name)
        .bind(pattern.classification.as_str())
        .bind(&pattern.reason)
        .bind(pattern.confidence)
        .bind(to_i64(pattern.occurrences))
        .bind(&pattern.domain)
        .bind(pattern.created_at)
        .bind(pattern.last_seen)
        .bind(to_i64(pattern.revision))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_pattern(&self, pattern: &Pattern, expected_revision: u64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE patterns SET
                reason = $2,
                confidence = $3,
                occurrences = $4,
                domain = $5,
                last_seen = $6,
                revision = $7
            WHERE name = $1 AND revision = $8
            "#,
        )
        .bind(&pattern.name)
        .bind(&pattern.reason)
        .bind(pattern.confidence)
        .bind(to_i64(pattern.occurrences))
        .bind(&pattern.domain)
        .bind(pattern.last_seen)
        .bind(to_i64(pattern.revision))
        .bind(to_i64(expected_revision))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_pattern(&pattern.name).await? {
                Some(_) => Err(StoreError::Conflict(format!(
                    "pattern '{}' changed since revision {}",
                    pattern.name, expected_revision
                ))),
                None => Err(StoreError::NotFound(pattern.name.clone())),
            };
        }
        Ok(())
    }

    async fn find_pattern(&self, name: &str) -> Result<Option<Pattern>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM patterns WHERE name = $1", PATTERN_COLUMNS))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(pattern_from_row).transpose()
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM patterns WHERE last_seen < $1 ORDER BY name")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(StoreError::from))
            .collect()
    }

    async fn query_patterns(&self, query: &PatternQuery) -> Result<Vec<Pattern>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM patterns
            WHERE classification = $1
              AND ($2 OR occurrences > 0)
              AND ($3::TEXT IS NULL OR domain = $3)
            ORDER BY occurrences DESC, confidence DESC, last_seen DESC, name ASC
            LIMIT $4
            "#,
            PATTERN_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(query.classification.as_str())
            .bind(query.include_dormant)
            .bind(&query.domain)
            .bind(to_i64(query.limit as u64))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(pattern_from_row).collect()
    }

    async fn insert_link(&self, link: &Link) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO pattern_links (source, target, strength, created_at, updated_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&link.source)
        .bind(&link.target)
        .bind(link.strength)
        .bind(link.created_at)
        .bind(link.updated_at)
        .bind(to_i64(link.revision))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_link(&self, link: &Link, expected_revision: u64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE pattern_links SET strength = $3, updated_at = $4, revision = $5
            WHERE source = $1 AND target = $2 AND revision = $6
            "#,
        )
        .bind(&link.source)
        .bind(&link.target)
        .bind(link.strength)
        .bind(link.updated_at)
        .bind(to_i64(link.revision))
        .bind(to_i64(expected_revision))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_link(&link.source, &link.target).await? {
                Some(_) => Err(StoreError::Conflict(format!(
                    "link {} -> {} changed since revision {}",
                    link.source, link.target, expected_revision
                ))),
                None => Err(StoreError::NotFound(format!("{} -> {}", link.source, link.target))),
            };
        }
        Ok(())
    }

    async fn find_link(&self, source: &str, target: &str) -> Result<Option<Link>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pattern_links WHERE source = $1 AND target = $2",
            LINK_COLUMNS
        ))
        .bind(source)
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn links_touching(&self, name: &str) -> Result<Vec<Link>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pattern_links WHERE source = $1 OR target = $1 ORDER BY source, target",
            LINK_COLUMNS
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(link_from_row).collect()
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE classification = 'SUCCESS') AS success_count,
                COUNT(*) FILTER (WHERE classification = 'FAILURE') AS failure_count,
                COUNT(*) FILTER (WHERE occurrences = 0) AS dormant_count,
                (SELECT COUNT(*) FROM pattern_links) AS link_count,
                (SELECT COALESCE(AVG(strength), 0)::DOUBLE PRECISION FROM pattern_links) AS avg_link_strength
            FROM patterns
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total: to_u64(row.try_get("total")?),
            success_count: to_u64(row.try_get("success_count")?),
            failure_count: to_u64(row.try_get("failure_count")?),
            dormant_count: to_u64(row.try_get("dormant_count")?),
            link_count: to_u64(row.try_get("link_count")?),
            avg_link_strength: row.try_get("avg_link_strength")?,
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
