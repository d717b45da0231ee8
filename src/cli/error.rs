use crate::download::index::IndexError;
use crate::download::label::LabelError;

// Exit codes for CLI automation
pub const SUCCESS: i32 = 0;
pub const ERROR: i32 = 1;
pub const NOT_FOUND: i32 = 2;
pub const INVALID_INPUT: i32 = 3;

pub fn label_error_code(e: &LabelError) -> i32 {
    match e {
        LabelError::NotFound(_) => NOT_FOUND,
        LabelError::Empty | LabelError::Reserved(_) | LabelError::Exists(_) => INVALID_INPUT,
    }
}

pub fn index_error_code(e: &IndexError) -> i32 {
    match e {
        IndexError::UnknownRecord(_) | IndexError::UnknownLabel(_) => NOT_FOUND,
        IndexError::UnknownProjection | IndexError::InvalidOrder => ERROR,
    }
}
