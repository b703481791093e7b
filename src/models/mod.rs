pub mod domain;
pub mod question;
