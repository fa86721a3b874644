//! PostgreSQL team repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crm_core::domain::Team;
use crm_core::error::DomainError;
use crm_core::repositories::TeamRepository;

use super::db_error;

pub struct PgTeamRepository {
    pool: PgPool,
}

impl PgTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    leader_id: Option<Uuid>,
    member_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            name: row.name,
            leader_id: row.leader_id,
            member_ids: row.member_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_TEAMS: &str = r#"
    SELECT t.id, t.name, t.leader_id,
           ARRAY(SELECT m.user_id FROM team_members m WHERE m.team_id = t.id) AS member_ids,
           t.created_at, t.updated_at
    FROM teams t
"#;

async fn replace_members(conn: &mut PgConnection, team: &Team) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM team_members WHERE team_id = $1")
        .bind(team.id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO team_members (team_id, user_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING")
        .bind(team.id)
        .bind(&team.member_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl TeamRepository for PgTeamRepository {
    async fn list(&self) -> Result<Vec<Team>, DomainError> {
        let rows: Vec<TeamRow> = sqlx::query_as(&format!("{SELECT_TEAMS} ORDER BY t.name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing teams", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Team>, DomainError> {
        let row: Option<TeamRow> = sqlx::query_as(&format!("{SELECT_TEAMS} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding team", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, team: &Team) -> Result<Team, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        sqlx::query("INSERT INTO teams (id, name, leader_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(team.id)
            .bind(&team.name)
            .bind(team.leader_id)
            .bind(team.created_at)
            .bind(team.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("creating team", e))?;
        replace_members(&mut tx, team)
            .await
            .map_err(|e| db_error("writing team members", e))?;

        tx.commit().await.map_err(|e| db_error("committing team", e))?;
        Ok(team.clone())
    }

    async fn update(&self, team: &Team) -> Result<Team, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let result = sqlx::query("UPDATE teams SET name = $2, leader_id = $3, updated_at = $4 WHERE id = $1")
            .bind(team.id)
            .bind(&team.name)
            .bind(team.leader_id)
            .bind(team.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("updating team", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("team", team.id));
        }
        replace_members(&mut tx, team)
            .await
            .map_err(|e| db_error("writing team members", e))?;

        tx.commit().await.map_err(|e| db_error("committing team", e))?;
        Ok(team.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting team", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("team", id));
        }
        Ok(())
    }
}
