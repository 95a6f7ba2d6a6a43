//! Database repository for leaders, contacts and the bulk procedures.
//!
//! Each bulk procedure runs in a single transaction; a business-rule failure
//! rolls it back and is reported as an `ok: false` response.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateLeaderRequest, CreatePersonRequest, DelegateOptions, DelegatePeopleRequest,
    DelegatePeopleResponse, Leader, LeaderDirectoryEntry, LeaderStatus, LeaderTab, Person,
    RemovalMode, RemoveLeaderRequest, RemoveLeaderResponse,
};

/// Ledger name of the delegate procedure.
pub const PROCEDURE_DELEGATE_PEOPLE: &str = "delegate_people";
/// Ledger name of the remove procedure.
pub const PROCEDURE_REMOVE_LEADER: &str = "remove_leader";

const LEADER_COLUMNS: &str = "id, email, display_name, status, created_at, updated_at";
const PERSON_COLUMNS: &str = "id, full_name, owner_id, tags, project_ids, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== LEADER OPERATIONS ====================

    /// List one directory tab, each leader with its contact count.
    pub async fn list_directory(
        &self,
        tab: LeaderTab,
    ) -> Result<Vec<LeaderDirectoryEntry>, AppError> {
        let statuses = tab.statuses();
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            r#"SELECT l.id, l.email, l.display_name, l.status, l.created_at, l.updated_at,
                      COUNT(p.id) AS people_count
               FROM leaders l
               LEFT JOIN people p ON p.owner_id = l.id
               WHERE l.status IN ({placeholders})
               GROUP BY l.id
               ORDER BY COALESCE(l.display_name, l.email)"#
        );

        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| LeaderDirectoryEntry {
                leader: leader_from_row(row),
                people_count: row.get("people_count"),
            })
            .collect())
    }

    /// List active leaders, optionally leaving one out.
    pub async fn list_active_leaders(&self, exclude: Option<&str>) -> Result<Vec<Leader>, AppError> {
        let sql = format!(
            "SELECT {LEADER_COLUMNS} FROM leaders WHERE status = 'ACTIVE' AND id != ? ORDER BY COALESCE(display_name, email)"
        );
        let rows = sqlx::query(&sql)
            .bind(exclude.unwrap_or(""))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(leader_from_row).collect())
    }

    /// Get a leader by ID.
    pub async fn get_leader(&self, id: &str) -> Result<Option<Leader>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_leader(&mut *conn, id).await
    }

    /// Create a new leader.
    pub async fn create_leader(&self, request: &CreateLeaderRequest) -> Result<Leader, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let email = request.email.trim().to_string();

        sqlx::query(
            "INSERT INTO leaders (id, email, display_name, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&request.display_name)
        .bind(request.status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::Conflict(format!("Leader with email {} already exists", email));
                }
            }
            AppError::from(e)
        })?;

        Ok(Leader {
            id,
            email,
            display_name: request.display_name.clone(),
            status: request.status,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Set a leader's status and bump its timestamp.
    pub async fn update_leader_status(
        &self,
        id: &str,
        status: LeaderStatus,
    ) -> Result<Leader, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE leaders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Leader {} not found", id)));
        }

        self.get_leader(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leader {} not found", id)))
    }

    // ==================== PEOPLE OPERATIONS ====================

    /// Create a contact under an existing leader.
    pub async fn create_person(&self, request: &CreatePersonRequest) -> Result<Person, AppError> {
        if self.get_leader(&request.owner_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Leader {} not found",
                request.owner_id
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO people (id, full_name, owner_id, tags, project_ids, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(request.full_name.trim())
        .bind(&request.owner_id)
        .bind(serde_json::to_string(&request.tags)?)
        .bind(serde_json::to_string(&request.project_ids)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Person {
            id,
            full_name: request.full_name.trim().to_string(),
            owner_id: request.owner_id.clone(),
            tags: request.tags.clone(),
            project_ids: request.project_ids.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List contacts owned by a leader.
    pub async fn list_people(&self, owner_id: &str) -> Result<Vec<Person>, AppError> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM people WHERE owner_id = ? ORDER BY full_name");
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(person_from_row).collect())
    }

    /// Count contacts owned by a leader.
    pub async fn count_people(&self, owner_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM people WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    // ==================== BULK PROCEDURES ====================

    /// Reassign every contact of one leader to another.
    pub async fn delegate_people(
        &self,
        request: &DelegatePeopleRequest,
    ) -> Result<DelegatePeopleResponse, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        if let Some(operation_id) = &request.operation_id {
            match recorded_response(&mut *tx, operation_id, PROCEDURE_DELEGATE_PEOPLE).await {
                Ok(Some(stored)) => {
                    tracing::info!(operation_id = %operation_id, "Replaying recorded delegate_people");
                    return Ok(serde_json::from_str(&stored)?);
                }
                Ok(None) => {}
                Err(e) if e.is_business_rule() => {
                    return Ok(DelegatePeopleResponse::failed(e.message()))
                }
                Err(e) => return Err(e),
            }
        }

        let moved = match delegate_in_tx(&mut *tx, request).await {
            Ok(moved) => moved,
            Err(e) if e.is_business_rule() => {
                tracing::warn!(from = %request.from_leader, to = %request.to_leader, "delegate_people refused: {}", e);
                return Ok(DelegatePeopleResponse::failed(e.message()));
            }
            Err(e) => return Err(e),
        };

        let response = DelegatePeopleResponse::moved(moved);
        if let Some(operation_id) = &request.operation_id {
            record_response(&mut *tx, operation_id, PROCEDURE_DELEGATE_PEOPLE, &response).await?;
        }
        tx.commit().await?;

        tracing::info!(
            from = %request.from_leader,
            to = %request.to_leader,
            moved,
            "Delegated contacts"
        );
        Ok(response)
    }

    /// Remove a leader, deleting or transferring its contacts first.
    pub async fn remove_leader(
        &self,
        request: &RemoveLeaderRequest,
    ) -> Result<RemoveLeaderResponse, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        if let Some(operation_id) = &request.p_operation_id {
            match recorded_response(&mut *tx, operation_id, PROCEDURE_REMOVE_LEADER).await {
                Ok(Some(stored)) => {
                    tracing::info!(operation_id = %operation_id, "Replaying recorded remove_leader");
                    return Ok(serde_json::from_str(&stored)?);
                }
                Ok(None) => {}
                Err(e) if e.is_business_rule() => {
                    return Ok(RemoveLeaderResponse::failed(e.message()))
                }
                Err(e) => return Err(e),
            }
        }

        let processed = match remove_in_tx(&mut *tx, request).await {
            Ok(processed) => processed,
            Err(e) if e.is_business_rule() => {
                tracing::warn!(leader = %request.p_leader_id, "remove_leader refused: {}", e);
                return Ok(RemoveLeaderResponse::failed(e.message()));
            }
            Err(e) => return Err(e),
        };

        let response = RemoveLeaderResponse::processed(processed);
        if let Some(operation_id) = &request.p_operation_id {
            record_response(&mut *tx, operation_id, PROCEDURE_REMOVE_LEADER, &response).await?;
        }
        tx.commit().await?;

        tracing::info!(
            leader = %request.p_leader_id,
            mode = request.p_mode.as_str(),
            processed,
            "Removed leader"
        );
        Ok(response)
    }

    // ==================== OPERATION LEDGER ====================

    /// Drop ledger entries older than `retention`.
    pub async fn prune_operations(&self, retention: std::time::Duration) -> Result<u64, AppError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| AppError::Internal(format!("Invalid ledger retention: {}", e)))?;
        self.prune_operations_before(Utc::now() - retention).await
    }

    /// Drop ledger entries recorded before `cutoff`.
    pub async fn prune_operations_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM rpc_operations WHERE created_at < ?")
            .bind(ledger_timestamp(cutoff))
            .execute(&self.pool)
            .await?;

        let pruned = result.rows_affected();
        if pruned > 0 {
            tracing::info!(pruned, "Pruned operation ledger");
        }
        Ok(pruned)
    }
}

// Transaction bodies

async fn delegate_in_tx(
    conn: &mut SqliteConnection,
    request: &DelegatePeopleRequest,
) -> Result<i64, AppError> {
    if request.from_leader == request.to_leader {
        return Err(AppError::Validation(
            "Cannot delegate contacts to the same leader".to_string(),
        ));
    }

    require_leader(conn, &request.from_leader).await?;
    require_active_target(conn, &request.to_leader).await?;

    let now = Utc::now().to_rfc3339();
    let moved = reassign_people(
        conn,
        &request.from_leader,
        &request.to_leader,
        request.opts,
        &now,
    )
    .await?;

    if request.opts.deactivate_from {
        sqlx::query("UPDATE leaders SET status = 'INACTIVE', updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&request.from_leader)
            .execute(&mut *conn)
            .await?;
    }

    Ok(moved)
}

async fn remove_in_tx(
    conn: &mut SqliteConnection,
    request: &RemoveLeaderRequest,
) -> Result<i64, AppError> {
    require_leader(conn, &request.p_leader_id).await?;

    let processed = match request.p_mode {
        RemovalMode::DeleteContacts => {
            let result = sqlx::query("DELETE FROM people WHERE owner_id = ?")
                .bind(&request.p_leader_id)
                .execute(&mut *conn)
                .await?;
            result.rows_affected() as i64
        }
        RemovalMode::TransferContacts => {
            let target = request
                .p_target_leader_id
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    AppError::Validation("Transfer mode requires a target leader".to_string())
                })?;
            if target == request.p_leader_id {
                return Err(AppError::Validation(
                    "Cannot transfer contacts to the leader being removed".to_string(),
                ));
            }
            require_active_target(conn, target).await?;

            let now = Utc::now().to_rfc3339();
            reassign_people(
                conn,
                &request.p_leader_id,
                target,
                DelegateOptions::default(),
                &now,
            )
            .await?
        }
    };

    sqlx::query("DELETE FROM leaders WHERE id = ?")
        .bind(&request.p_leader_id)
        .execute(&mut *conn)
        .await?;

    Ok(processed)
}

async fn reassign_people(
    conn: &mut SqliteConnection,
    from: &str,
    to: &str,
    opts: DelegateOptions,
    now: &str,
) -> Result<i64, AppError> {
    let mut sql = String::from("UPDATE people SET owner_id = ?, updated_at = ?");
    if !opts.transfer_tags {
        sql.push_str(", tags = '[]'");
    }
    if !opts.transfer_projects {
        sql.push_str(", project_ids = '[]'");
    }
    sql.push_str(" WHERE owner_id = ?");

    let result = sqlx::query(&sql)
        .bind(to)
        .bind(now)
        .bind(from)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() as i64)
}

async fn fetch_leader(conn: &mut SqliteConnection, id: &str) -> Result<Option<Leader>, AppError> {
    let sql = format!("SELECT {LEADER_COLUMNS} FROM leaders WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(leader_from_row))
}

async fn require_leader(conn: &mut SqliteConnection, id: &str) -> Result<Leader, AppError> {
    fetch_leader(conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Leader {} not found", id)))
}

async fn require_active_target(conn: &mut SqliteConnection, id: &str) -> Result<Leader, AppError> {
    let target = require_leader(conn, id).await?;
    if target.status != LeaderStatus::Active {
        return Err(AppError::Conflict(format!(
            "Target leader {} is not active ({})",
            id,
            target.status.as_str()
        )));
    }
    Ok(target)
}

/// Look up a previously recorded procedure response.
async fn recorded_response(
    conn: &mut SqliteConnection,
    operation_id: &str,
    procedure: &str,
) -> Result<Option<String>, AppError> {
    let row = sqlx::query("SELECT procedure, response FROM rpc_operations WHERE operation_id = ?")
        .bind(operation_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let recorded_for: String = row.get("procedure");
    if recorded_for != procedure {
        return Err(AppError::Conflict(format!(
            "Operation {} was already used for {}",
            operation_id, recorded_for
        )));
    }
    Ok(Some(row.get("response")))
}

async fn record_response<T: serde::Serialize>(
    conn: &mut SqliteConnection,
    operation_id: &str,
    procedure: &str,
    response: &T,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO rpc_operations (operation_id, procedure, response, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(operation_id)
    .bind(procedure)
    .bind(serde_json::to_string(response)?)
    .bind(ledger_timestamp(Utc::now()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// Fixed width so `created_at` compares correctly as text.
fn ledger_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Helper functions for row conversion

fn leader_from_row(row: &sqlx::sqlite::SqliteRow) -> Leader {
    let status: String = row.get("status");
    Leader {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        // The CHECK constraint keeps unknown values out of the table.
        status: LeaderStatus::parse(&status).unwrap_or(LeaderStatus::Inactive),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn person_from_row(row: &sqlx::sqlite::SqliteRow) -> Person {
    let tags: String = row.get("tags");
    let project_ids: String = row.get("project_ids");
    Person {
        id: row.get("id"),
        full_name: row.get("full_name"),
        owner_id: row.get("owner_id"),
        tags: parse_json_array(&tags),
        project_ids: parse_json_array(&project_ids),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
