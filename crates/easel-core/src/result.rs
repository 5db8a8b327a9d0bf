use crate::error::EaselError;

pub type EaselResult<T> = Result<T, EaselError>;
