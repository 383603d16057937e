//! In-memory [`CaseStore`] for development and tests.
//!
//! Everything lives behind one `parking_lot::RwLock`; a commit holds the
//! write lock for its whole duration, which makes it atomic. State does not
//! survive a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use olympus_core::{CaseId, CaseNumber, DocumentId};
use olympus_state::{AuditEntry, CaseFile};

use crate::error::StoreError;
use crate::traits::{CaseCommit, CasePage, CaseQuery, CaseStore, MAX_PAGE_LIMIT};

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<CaseId, CaseFile>,
    numbers: HashMap<CaseNumber, CaseId>,
    audit: HashMap<CaseId, Vec<AuditEntry>>,
    documents: HashMap<DocumentId, CaseId>,
}

/// Process-local case store.
#[derive(Debug, Default)]
pub struct MemoryCaseStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CaseStore for MemoryCaseStore {
    async fn insert_case(&self, file: &CaseFile) -> Result<(), StoreError> {
        self.check_available()?;
        let case = file.case();
        let mut inner = self.inner.write();
        if inner.files.contains_key(&case.id) {
            return Err(StoreError::Duplicate(format!("case id {}", case.id)));
        }
        if inner.numbers.contains_key(&case.number) {
            return Err(StoreError::Duplicate(format!("case number {}", case.number)));
        }
        inner.numbers.insert(case.number.clone(), case.id);
        for doc in file.documents() {
            inner.documents.insert(doc.id, case.id);
        }
        inner.audit.insert(case.id, Vec::new());
        inner.files.insert(case.id, file.clone());
        Ok(())
    }

    async fn load_case(&self, id: CaseId) -> Result<CaseFile, StoreError> {
        self.check_available()?;
        self.inner
            .read()
            .files
            .get(&id)
            .cloned()
            .ok_or(StoreError::CaseNotFound(id))
    }

    async fn list_cases(&self, query: CaseQuery) -> Result<CasePage, StoreError> {
        self.check_available()?;
        let inner = self.inner.read();
        let mut matching: Vec<_> = inner
            .files
            .values()
            .map(CaseFile::case)
            .filter(|c| query.status.map_or(true, |s| c.status == s))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.number.cmp(&a.number))
        });
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit.min(MAX_PAGE_LIMIT) as usize)
            .cloned()
            .collect();
        Ok(CasePage { items, total })
    }

    async fn commit(&self, commit: CaseCommit) -> Result<Vec<AuditEntry>, StoreError> {
        self.check_available()?;
        let case_id = commit.case_id();
        let mut inner = self.inner.write();

        let stored = inner
            .files
            .get(&case_id)
            .ok_or(StoreError::CaseNotFound(case_id))?;
        if stored.case().version != commit.expected_version {
            return Err(StoreError::ConcurrentConflict {
                case_id,
                expected_version: commit.expected_version,
            });
        }

        let (_, mut steps, mut documents) = stored.clone().into_parts();
        for changed in commit.steps {
            match steps.iter_mut().find(|s| s.id == changed.id) {
                Some(slot) => *slot = changed,
                None => {
                    return Err(StoreError::Backend(format!(
                        "step {} does not belong to case {case_id}",
                        changed.id
                    )))
                }
            }
        }
        let mut new_documents = Vec::new();
        for doc in commit.documents {
            match documents.iter_mut().find(|d| d.id == doc.id) {
                Some(slot) => *slot = doc,
                None => {
                    new_documents.push(doc.id);
                    documents.push(doc);
                }
            }
        }

        let history = inner.audit.entry(case_id).or_default();
        let base = history.len() as i64;
        let appended: Vec<AuditEntry> = commit
            .audit
            .into_iter()
            .zip(1i64..)
            .map(|(pending, offset)| pending.into_entry(case_id, base + offset))
            .collect();
        history.extend(appended.iter().cloned());

        for doc_id in new_documents {
            inner.documents.insert(doc_id, case_id);
        }
        inner
            .files
            .insert(case_id, CaseFile::from_parts(commit.case, steps, documents));
        Ok(appended)
    }

    async fn history(&self, id: CaseId) -> Result<Vec<AuditEntry>, StoreError> {
        self.check_available()?;
        let inner = self.inner.read();
        if !inner.files.contains_key(&id) {
            return Err(StoreError::CaseNotFound(id));
        }
        Ok(inner.audit.get(&id).cloned().unwrap_or_default())
    }

    async fn find_document(&self, id: DocumentId) -> Result<CaseId, StoreError> {
        self.check_available()?;
        self.inner
            .read()
            .documents
            .get(&id)
            .copied()
            .ok_or(StoreError::DocumentNotFound(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
