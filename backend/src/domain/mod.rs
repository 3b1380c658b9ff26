pub mod email_client;
pub mod full_name;
pub mod order_confirmation_email;
pub mod order_record;
pub mod recipient_email;
pub mod user_record;
pub mod user_repository;
pub mod verification_token;

pub use crate::domain::full_name::FullName;
pub use crate::domain::order_record::{OrderItem, OrderRecord};
pub use crate::domain::recipient_email::RecipientEmail;
pub use crate::domain::user_record::{NewUser, UserRecord};
pub use crate::domain::verification_token::VerificationToken;
