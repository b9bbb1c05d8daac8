pub mod arithmetic;
pub mod batch_inverse;
pub mod domain;
pub mod polynomial;
pub mod span;

pub use domain::EvaluationDomain;
pub use polynomial::Polynomial;
pub use span::PolynomialSpan;
