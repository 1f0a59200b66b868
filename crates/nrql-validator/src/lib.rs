//! NRQL query validation
//!
//! Every query, identifier and time range that arrives from outside passes
//! through [`NrqlValidator`] before it is used to build a cache key or a
//! backend request.
//!
//! # Example
//!
//! ```
//! use nrql_validator::NrqlValidator;
//!
//! let validator = NrqlValidator::default();
//! let query = validator
//!     .sanitize("SELECT count(*)\n  FROM Transaction SINCE 1 hour ago")
//!     .unwrap();
//! assert_eq!(query, "SELECT count(*) FROM Transaction SINCE 1 hour ago");
//!
//! assert!(validator.sanitize("SELECT * FROM Transaction; DROP TABLE users").is_err());
//! ```

pub mod patterns;
pub mod scanner;
pub mod time_range;
pub mod validator;

pub use scanner::Scanner;
pub use time_range::TimeRangeKind;
pub use validator::{NrqlValidator, ValidatorConfig};
