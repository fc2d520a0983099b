use chrono::{DateTime, Utc};

use super::domain::{Notice, NoticeId, NoticeRead};
use crate::directory::domain::EmployeeId;
use crate::store::RepositoryError;

pub trait NoticeRepository: Send + Sync {
    fn notices(&self) -> Result<Vec<Notice>, RepositoryError>;
    fn notice(&self, id: NoticeId) -> Result<Option<Notice>, RepositoryError>;
    fn insert_notice(&self, notice: Notice) -> Result<Notice, RepositoryError>;
    fn update_notice(&self, notice: Notice) -> Result<(), RepositoryError>;
    /// Removes the notice together with every read recorded against it.
    fn remove_notice(&self, id: NoticeId) -> Result<(), RepositoryError>;

    fn reads(&self) -> Result<Vec<NoticeRead>, RepositoryError>;
    fn reads_for_employee(&self, employee: EmployeeId) -> Result<Vec<NoticeRead>, RepositoryError>;
    /// Inserts reads for (employee, notice) pairs not yet recorded, in one batch. Existing pairs
    /// are skipped silently. Returns how many rows were created.
    fn insert_reads(&self, reads: Vec<NoticeRead>) -> Result<usize, RepositoryError>;
    /// Gets or creates the read and stamps `acknowledged_at` unless it is already set.
    fn acknowledge(
        &self,
        employee: EmployeeId,
        notice: NoticeId,
        at: DateTime<Utc>,
    ) -> Result<NoticeRead, RepositoryError>;
}
