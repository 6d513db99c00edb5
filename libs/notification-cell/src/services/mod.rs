pub mod feed;
pub mod notification;

pub use notification::NotificationService;
