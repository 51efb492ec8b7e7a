pub mod user_id;

pub use user_id::{UserId, USER_ID_HEADER};
