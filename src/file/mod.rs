pub mod cleanup;
pub mod layout;
