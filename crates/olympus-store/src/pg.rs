//! # PostgreSQL Case Store
//!
//! [`CaseStore`] over SQLx. Every commit runs in one transaction:
//!
//! 1. `UPDATE cases ... WHERE id = $id AND version = $expected` (OCC).
//!    Zero affected rows means the case is gone or was modified concurrently.
//! 2. Step rows are updated in place.
//! 3. Documents are upserted (`ON CONFLICT (id)` only touches the signature).
//! 4. Audit entries are appended after the current per-case maximum
//!    sequence. The row lock taken by step 1 serializes appends per case.
//!
//! If any statement fails the transaction is dropped and rolled back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use olympus_core::{
    AuditEntryId, CaseId, CaseNumber, DocumentId, StepId, Timestamp, UserRef, ValidationError,
};
use olympus_state::{AuditEntry, Case, CaseFile, Document, DocumentSignature, Step};

use crate::error::StoreError;
use crate::traits::{CaseCommit, CasePage, CaseQuery, CaseStore, MAX_PAGE_LIMIT};

/// Isolation for multi-statement reads of one case file.
const READ_SNAPSHOT: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// Open a connection pool and apply the embedded migrations.
pub async fn connect(url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await
        .map_err(map_sqlx)?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Case store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url`, migrate, and wrap the pool.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        connect(url).await.map(Self::new)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn insert_case(&self, file: &CaseFile) -> Result<(), StoreError> {
        let case = file.case();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "INSERT INTO cases (id, number, subject, description, status, owner,
                                created_at, updated_at, closed_at, version)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(*case.id.as_uuid())
        .bind(case.number.as_str())
        .bind(&case.subject)
        .bind(&case.description)
        .bind(case.status.as_str())
        .bind(case.owner.as_ref().map(UserRef::as_str))
        .bind(case.created_at.into_datetime())
        .bind(case.updated_at.into_datetime())
        .bind(case.closed_at.map(Timestamp::into_datetime))
        .bind(case.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, || format!("case number {}", case.number)))?;

        for step in file.steps() {
            sqlx::query(
                "INSERT INTO case_steps (id, case_id, sequence, title, description, status,
                                         started_at, completed_at, completed_by, comment)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(*step.id.as_uuid())
            .bind(*case.id.as_uuid())
            .bind(sequence_to_db(step.sequence)?)
            .bind(&step.title)
            .bind(&step.description)
            .bind(step.status.as_str())
            .bind(step.started_at.map(Timestamp::into_datetime))
            .bind(step.completed_at.map(Timestamp::into_datetime))
            .bind(step.completed_by.as_ref().map(UserRef::as_str))
            .bind(&step.comment)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        for doc in file.documents() {
            upsert_document(&mut tx, doc).await?;
        }

        tx.commit().await.map_err(map_sqlx)
    }

    async fn load_case(&self, id: CaseId) -> Result<CaseFile, StoreError> {
        // Case, steps and documents must come from the same commit.
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query(READ_SNAPSHOT)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        let case = sqlx::query_as::<_, CaseRow>(
            "SELECT id, number, subject, description, status, owner,
                    created_at, updated_at, closed_at, version
             FROM cases WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .ok_or(StoreError::CaseNotFound(id))?
        .into_case()?;

        let steps = sqlx::query_as::<_, StepRow>(
            "SELECT id, case_id, sequence, title, description, status,
                    started_at, completed_at, completed_by, comment
             FROM case_steps WHERE case_id = $1 ORDER BY sequence",
        )
        .bind(*id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .into_iter()
        .map(StepRow::into_step)
        .collect::<Result<Vec<_>, _>>()?;

        let documents = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, case_id, name, kind, content_digest, size_bytes, uploaded_at,
                    uploaded_by, signature_hash, signed_by, signed_at
             FROM case_documents WHERE case_id = $1 ORDER BY uploaded_at, id",
        )
        .bind(*id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .into_iter()
        .map(DocumentRow::into_document)
        .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(CaseFile::from_parts(case, steps, documents))
    }

    async fn list_cases(&self, query: CaseQuery) -> Result<CasePage, StoreError> {
        let status = query.status.map(|s| s.as_str());
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cases WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let items = sqlx::query_as::<_, CaseRow>(
            "SELECT id, number, subject, description, status, owner,
                    created_at, updated_at, closed_at, version
             FROM cases WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at DESC, number DESC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(i64::from(query.limit.min(MAX_PAGE_LIMIT)))
        .bind(i64::from(query.skip))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?
        .into_iter()
        .map(CaseRow::into_case)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(CasePage {
            items,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn commit(&self, commit: CaseCommit) -> Result<Vec<AuditEntry>, StoreError> {
        let case = &commit.case;
        let case_id = case.id;
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let updated = sqlx::query(
            "UPDATE cases
             SET subject = $1, description = $2, status = $3, owner = $4,
                 updated_at = $5, closed_at = $6, version = $7
             WHERE id = $8 AND version = $9",
        )
        .bind(&case.subject)
        .bind(&case.description)
        .bind(case.status.as_str())
        .bind(case.owner.as_ref().map(UserRef::as_str))
        .bind(case.updated_at.into_datetime())
        .bind(case.closed_at.map(Timestamp::into_datetime))
        .bind(case.version)
        .bind(*case_id.as_uuid())
        .bind(commit.expected_version)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if updated.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM cases WHERE id = $1")
                .bind(*case_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?;
            return Err(match exists {
                None => StoreError::CaseNotFound(case_id),
                Some(_) => StoreError::ConcurrentConflict {
                    case_id,
                    expected_version: commit.expected_version,
                },
            });
        }

        for step in &commit.steps {
            let result = sqlx::query(
                "UPDATE case_steps
                 SET status = $1, started_at = $2, completed_at = $3, completed_by = $4, comment = $5
                 WHERE id = $6 AND case_id = $7",
            )
            .bind(step.status.as_str())
            .bind(step.started_at.map(Timestamp::into_datetime))
            .bind(step.completed_at.map(Timestamp::into_datetime))
            .bind(step.completed_by.as_ref().map(UserRef::as_str))
            .bind(&step.comment)
            .bind(*step.id.as_uuid())
            .bind(*case_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::Backend(format!(
                    "step {} does not belong to case {case_id}",
                    step.id
                )));
            }
        }

        for doc in &commit.documents {
            upsert_document(&mut tx, doc).await?;
        }

        let base: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence), 0)::BIGINT FROM case_audit_entries WHERE case_id = $1",
        )
        .bind(*case_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let mut appended = Vec::with_capacity(commit.audit.len());
        for (pending, offset) in commit.audit.into_iter().zip(1i64..) {
            let entry = pending.into_entry(case_id, base + offset);
            sqlx::query(
                "INSERT INTO case_audit_entries (id, case_id, sequence, action, description,
                                                 actor, metadata, recorded_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(*entry.id.as_uuid())
            .bind(*case_id.as_uuid())
            .bind(entry.sequence)
            .bind(entry.action.as_str())
            .bind(&entry.description)
            .bind(entry.actor.as_ref().map(UserRef::as_str))
            .bind(&entry.metadata)
            .bind(entry.recorded_at.into_datetime())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
            appended.push(entry);
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(appended)
    }

    async fn history(&self, id: CaseId) -> Result<Vec<AuditEntry>, StoreError> {
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM cases WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if exists.is_none() {
            return Err(StoreError::CaseNotFound(id));
        }

        sqlx::query_as::<_, AuditRow>(
            "SELECT id, case_id, sequence, action, description, actor, metadata, recorded_at
             FROM case_audit_entries WHERE case_id = $1 ORDER BY sequence",
        )
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?
        .into_iter()
        .map(AuditRow::into_entry)
        .collect()
    }

    async fn find_document(&self, id: DocumentId) -> Result<CaseId, StoreError> {
        let case_id: Option<Uuid> =
            sqlx::query_scalar("SELECT case_id FROM case_documents WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        case_id
            .map(CaseId::from_uuid)
            .ok_or(StoreError::DocumentNotFound(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx)
    }
}

async fn upsert_document(
    tx: &mut Transaction<'_, Postgres>,
    doc: &Document,
) -> Result<(), StoreError> {
    let signature = doc.signature.as_ref();
    sqlx::query(
        "INSERT INTO case_documents (id, case_id, name, kind, content_digest, size_bytes,
                                     uploaded_at, uploaded_by, signature_hash, signed_by, signed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (id) DO UPDATE
         SET signature_hash = EXCLUDED.signature_hash,
             signed_by = EXCLUDED.signed_by,
             signed_at = EXCLUDED.signed_at",
    )
    .bind(*doc.id.as_uuid())
    .bind(*doc.case_id.as_uuid())
    .bind(&doc.name)
    .bind(doc.kind.as_str())
    .bind(&doc.content_digest)
    .bind(doc.size_bytes)
    .bind(doc.uploaded_at.into_datetime())
    .bind(doc.uploaded_by.as_ref().map(UserRef::as_str))
    .bind(signature.map(|s| s.hash.as_str()))
    .bind(signature.map(|s| s.signer.as_str()))
    .bind(signature.map(|s| s.signed_at.into_datetime()))
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}

// ─── Error mapping ──────────────────────────────────────────────────

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

fn map_unique(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        StoreError::Duplicate(what())
    } else {
        map_sqlx(e)
    }
}

fn corrupt(table: &str, e: ValidationError) -> StoreError {
    StoreError::Backend(format!("corrupt {table} row: {e}"))
}

fn sequence_to_db(sequence: u32) -> Result<i32, StoreError> {
    i32::try_from(sequence)
        .map_err(|_| StoreError::Backend(format!("step sequence {sequence} out of range")))
}

fn optional_user(table: &str, value: Option<String>) -> Result<Option<UserRef>, StoreError> {
    value
        .map(UserRef::new)
        .transpose()
        .map_err(|e| corrupt(table, e))
}

// ─── Row types ──────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: Uuid,
    number: String,
    subject: String,
    description: Option<String>,
    status: String,
    owner: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl CaseRow {
    fn into_case(self) -> Result<Case, StoreError> {
        Ok(Case {
            id: CaseId::from_uuid(self.id),
            number: CaseNumber::new(&self.number).map_err(|e| corrupt("cases", e))?,
            subject: self.subject,
            description: self.description,
            status: self.status.parse().map_err(|e| corrupt("cases", e))?,
            owner: optional_user("cases", self.owner)?,
            created_at: Timestamp::from_utc(self.created_at),
            updated_at: Timestamp::from_utc(self.updated_at),
            closed_at: self.closed_at.map(Timestamp::from_utc),
            version: self.version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: Uuid,
    case_id: Uuid,
    sequence: i32,
    title: String,
    description: Option<String>,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    completed_by: Option<String>,
    comment: Option<String>,
}

impl StepRow {
    fn into_step(self) -> Result<Step, StoreError> {
        Ok(Step {
            id: StepId::from_uuid(self.id),
            case_id: CaseId::from_uuid(self.case_id),
            sequence: u32::try_from(self.sequence).map_err(|_| {
                StoreError::Backend(format!("corrupt case_steps row: sequence {}", self.sequence))
            })?,
            title: self.title,
            description: self.description,
            status: self.status.parse().map_err(|e| corrupt("case_steps", e))?,
            started_at: self.started_at.map(Timestamp::from_utc),
            completed_at: self.completed_at.map(Timestamp::from_utc),
            completed_by: optional_user("case_steps", self.completed_by)?,
            comment: self.comment,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    case_id: Uuid,
    name: String,
    kind: String,
    content_digest: Option<String>,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
    uploaded_by: Option<String>,
    signature_hash: Option<String>,
    signed_by: Option<String>,
    signed_at: Option<DateTime<Utc>>,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, StoreError> {
        let signature = match (self.signature_hash, self.signed_by, self.signed_at) {
            (Some(hash), Some(signer), Some(signed_at)) => Some(DocumentSignature {
                hash,
                signer: UserRef::new(signer).map_err(|e| corrupt("case_documents", e))?,
                signed_at: Timestamp::from_utc(signed_at),
            }),
            (None, None, None) => None,
            _ => {
                return Err(StoreError::Backend(format!(
                    "corrupt case_documents row {}: partial signature",
                    self.id
                )))
            }
        };
        Ok(Document {
            id: DocumentId::from_uuid(self.id),
            case_id: CaseId::from_uuid(self.case_id),
            name: self.name,
            kind: self.kind.parse().map_err(|e| corrupt("case_documents", e))?,
            content_digest: self.content_digest,
            size_bytes: self.size_bytes,
            uploaded_at: Timestamp::from_utc(self.uploaded_at),
            uploaded_by: optional_user("case_documents", self.uploaded_by)?,
            signature,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    case_id: Uuid,
    sequence: i64,
    action: String,
    description: String,
    actor: Option<String>,
    metadata: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry, StoreError> {
        Ok(AuditEntry {
            id: AuditEntryId::from_uuid(self.id),
            case_id: CaseId::from_uuid(self.case_id),
            sequence: self.sequence,
            action: self
                .action
                .parse()
                .map_err(|e| corrupt("case_audit_entries", e))?,
            description: self.description,
            actor: optional_user("case_audit_entries", self.actor)?,
            metadata: self.metadata,
            recorded_at: Timestamp::from_utc(self.recorded_at),
        })
    }
}
