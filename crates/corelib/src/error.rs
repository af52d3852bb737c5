use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("orientation sample needs 3 values (roll, pitch, yaw), got {0}")]
    OrientationArity(usize),
    #[error("invalid orientation component '{0}'")]
    OrientationValue(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
