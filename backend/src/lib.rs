pub mod adapters;
pub mod configuration;
pub mod domain;
pub mod send_order_confirmation_handler;
pub mod send_verification_handler;
pub mod stream_record;
pub mod utils;
