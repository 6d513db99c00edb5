pub mod payment;
pub mod signature;

pub use payment::PaymentService;
