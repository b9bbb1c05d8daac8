use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithError {
    #[error("Invalid input length, expected length {0} but got {1}")]
    InvalidInputLength(usize, usize),
    #[error("Invalid domain size: {0}, expected a nonzero power of 2")]
    InvalidDomainSize(usize),
    #[error("Domain of size 2^{log_size} exceeds the field's two-adicity {two_adicity}")]
    DomainTooLarge { log_size: u32, two_adicity: u32 },
    #[error("Field element encoding is not canonical")]
    NonCanonicalEncoding,
    #[error("Interpolation points are not distinct")]
    RepeatedInterpolationPoint,
}
