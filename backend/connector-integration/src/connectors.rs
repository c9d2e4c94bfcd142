pub mod paystack;

pub use self::paystack::Paystack;
