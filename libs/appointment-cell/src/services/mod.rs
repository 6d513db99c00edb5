pub mod booking;
pub mod lifecycle;
pub mod pricing;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use pricing::PricingService;
