pub mod account;
pub mod class;
pub mod community;
pub mod event;
pub mod media;
pub mod notification;
pub mod pregnancy;
pub mod report;

pub use account::{Account, AccountWithProfile, AdminProfile, CollaboratorProfile, MotherProfile, Profile};
pub use class::{Class, Enrollment, RatingSummary, Review, Video};
pub use community::{Comment, Group, Membership, Post, Reaction, ReactionCount, ReactionToggle, SoftDelete};
pub use event::{Event, Registration};
pub use media::Media;
pub use notification::Notification;
pub use pregnancy::{Pregnancy, SymptomLog, WeekGuide};
pub use report::{DashboardStats, Report};
