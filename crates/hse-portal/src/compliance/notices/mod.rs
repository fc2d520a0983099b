//! Notices broadcast to an audience, with per-employee read and acknowledgement tracking.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{Notice, NoticeDraft, NoticeId, NoticeItem, NoticeMetrics, NoticeRead};
pub use repository::NoticeRepository;
pub use router::notice_router;
pub use service::NoticeService;
