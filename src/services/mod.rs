pub mod mailer;
pub mod notify;
pub mod storage;
pub mod week;

pub use mailer::{Email, LogMailer, Mailer};
pub use notify::{notify, record};
pub use storage::{FileStorage, MemoryFileStorage, StoredFile, Upload};
