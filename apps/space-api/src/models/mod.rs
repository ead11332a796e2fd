pub mod message;
pub mod space_member;
