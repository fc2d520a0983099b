use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{Notice, NoticeDraft, NoticeId, NoticeItem, NoticeMetrics, NoticeRead};
use super::repository::NoticeRepository;
use crate::access::Caller;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;
use crate::store::Sequence;
use crate::targeting::{reconcile, Engagement, OrgSnapshot, Reconciliation};
use crate::validation::{require_text, ValidationErrors};

static NOTICE_IDS: Sequence = Sequence::new();

pub struct NoticeService<S> {
    store: Arc<S>,
}

impl<S> NoticeService<S>
where
    S: NoticeRepository + DirectoryRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All notices, newest first.
    pub fn list(&self, caller: &Caller) -> Result<Vec<Notice>, ServiceError> {
        caller.require_manager()?;
        Ok(self.newest_first()?)
    }

    pub fn create(
        &self,
        caller: &Caller,
        draft: NoticeDraft,
        now: DateTime<Utc>,
    ) -> Result<Notice, ServiceError> {
        caller.require_manager()?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let notice = build_notice(&org, NoticeId(NOTICE_IDS.next()), draft, caller, now)?;
        let stored = self.store.insert_notice(notice)?;
        info!(notice = stored.id.0, scope = ?stored.scope.kind(), "notice published");
        Ok(stored)
    }

    pub fn update(
        &self,
        caller: &Caller,
        id: NoticeId,
        draft: NoticeDraft,
    ) -> Result<Notice, ServiceError> {
        caller.require_manager()?;
        let existing = self
            .store
            .notice(id)?
            .ok_or(ServiceError::NotFound("notice"))?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let mut notice = build_notice(&org, id, draft, caller, existing.created_at)?;
        notice.created_by = existing.created_by;
        self.store.update_notice(notice.clone())?;
        Ok(notice)
    }

    pub fn delete(&self, caller: &Caller, id: NoticeId) -> Result<(), ServiceError> {
        caller.require_manager()?;
        if self.store.notice(id)?.is_none() {
            return Err(ServiceError::NotFound("notice"));
        }
        self.store.remove_notice(id)?;
        info!(notice = id.0, "notice removed");
        Ok(())
    }

    /// The caller's notice feed. Flags describe the state before this view; afterwards every
    /// listed notice counts as read.
    pub fn my_notices(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<NoticeItem>, ServiceError> {
        let Some(employee_id) = caller.employee else {
            return Ok(Vec::new());
        };
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let Some(employee) = org.employee(employee_id) else {
            return Ok(Vec::new());
        };

        let notices = self.newest_first()?;
        let reads: HashMap<NoticeId, NoticeRead> = self
            .store
            .reads_for_employee(employee_id)?
            .into_iter()
            .map(|read| (read.notice, read))
            .collect();

        let items: Vec<NoticeItem> = org
            .records_for(employee, &notices)
            .into_iter()
            .map(|notice| {
                let read = reads.get(&notice.id);
                NoticeItem {
                    notice: notice.clone(),
                    read_at: read.map(|read| read.read_at),
                    is_unread: read.is_none(),
                    is_acknowledged: read.is_some_and(|read| read.acknowledged_at.is_some()),
                }
            })
            .collect();

        let missing: Vec<NoticeRead> = items
            .iter()
            .filter(|item| item.is_unread)
            .map(|item| NoticeRead {
                employee: employee_id,
                notice: item.notice.id,
                read_at: now,
                acknowledged_at: None,
            })
            .collect();
        if !missing.is_empty() {
            let created = self.store.insert_reads(missing)?;
            debug!(employee = employee_id.0, created, "notice reads recorded");
        }

        Ok(items)
    }

    /// Unread notices applicable to the caller, without recording a view.
    pub fn unread_count(&self, caller: &Caller) -> Result<usize, ServiceError> {
        let Some(employee_id) = caller.employee else {
            return Ok(0);
        };
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let Some(employee) = org.employee(employee_id) else {
            return Ok(0);
        };
        let notices = self.store.notices()?;
        let reads = self.store.reads_for_employee(employee_id)?;
        Ok(org
            .records_for(employee, &notices)
            .into_iter()
            .filter(|notice| !reads.iter().any(|read| read.notice == notice.id))
            .count())
    }

    /// Acknowledges an applicable notice. Notices that do not ask for acknowledgement are only
    /// marked as read.
    pub fn acknowledge(
        &self,
        caller: &Caller,
        id: NoticeId,
        now: DateTime<Utc>,
    ) -> Result<NoticeRead, ServiceError> {
        let employee_id = caller.employee.ok_or(ServiceError::NotFound("notice"))?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let employee = org
            .employee(employee_id)
            .ok_or(ServiceError::NotFound("notice"))?;
        let notice = self
            .store
            .notice(id)?
            .filter(|notice| notice.is_active && org.includes(employee, &notice.scope))
            .ok_or(ServiceError::NotFound("notice"))?;

        if notice.requires_acknowledgement {
            let read = self.store.acknowledge(employee_id, id, now)?;
            info!(notice = id.0, employee = employee_id.0, "notice acknowledged");
            return Ok(read);
        }

        self.store.insert_reads(vec![NoticeRead {
            employee: employee_id,
            notice: id,
            read_at: now,
            acknowledged_at: None,
        }])?;
        self.store
            .reads_for_employee(employee_id)?
            .into_iter()
            .find(|read| read.notice == id)
            .ok_or(ServiceError::NotFound("notice"))
    }

    pub fn metrics(&self, caller: &Caller) -> Result<NoticeMetrics, ServiceError> {
        caller.require_manager()?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let notices = self.store.notices()?;
        let reads = self.store.reads()?;

        let mut totals = Reconciliation::default();
        let mut total_notices = 0;
        for notice in notices.iter().filter(|notice| notice.is_active) {
            total_notices += 1;
            let engagements: Vec<Engagement> = reads
                .iter()
                .filter(|read| read.notice == notice.id)
                .map(|read| Engagement {
                    employee: read.employee,
                    acknowledged: read.acknowledged_at.is_some(),
                })
                .collect();
            totals += reconcile(
                &org.employees_for(&notice.scope),
                &engagements,
                notice.requires_acknowledgement,
            );
        }

        Ok(NoticeMetrics {
            total_notices,
            unread_notices: totals.unread,
            unacknowledged_notices: totals.unacknowledged,
        })
    }

    fn newest_first(&self) -> Result<Vec<Notice>, ServiceError> {
        let mut notices = self.store.notices()?;
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notices)
    }
}

fn build_notice(
    org: &OrgSnapshot,
    id: NoticeId,
    draft: NoticeDraft,
    caller: &Caller,
    created_at: DateTime<Utc>,
) -> Result<Notice, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = draft.title.trim().to_string();
    require_text(&mut errors, "title", &title);
    require_text(&mut errors, "content", &draft.content);
    let scope = draft.scope.resolve(org, &mut errors);

    match scope {
        Some(scope) if errors.is_empty() => Ok(Notice {
            id,
            title,
            content: draft.content,
            scope,
            requires_acknowledgement: draft.requires_acknowledgement,
            created_by: caller.identity,
            created_at,
            is_active: draft.is_active,
        }),
        _ => Err(errors),
    }
}
