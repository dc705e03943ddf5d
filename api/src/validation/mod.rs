//! Input Validation Module
//!
//! Every mutating endpoint passes its JSON body through this module before
//! any handler or storage code runs.
//!
//! # Overview
//!
//! 1. **Rules** - `FieldRule` / `RuleSet`, declarative constraints per endpoint
//! 2. **Validators** - pure predicates the rules are built from
//! 3. **Executor** - runs a rule set and collects every violation
//! 4. **Gate** - admits or rejects one payload; drives `ValidatedJson<T>`
//!
//! # Validation Error Response
//!
//! When validation fails, a 400 Bad Request is returned:
//!
//! ```json
//! {
//!   "error": "Validation Error",
//!   "details": [
//!     {"field": "title", "message": "title is required"},
//!     {"field": "ingredients", "message": "must contain at least one item"}
//!   ]
//! }
//! ```

pub mod executor;
pub mod extractors;
pub mod gate;
pub mod rules;
pub mod schemas;
pub mod validators;

pub use executor::execute;
pub use extractors::{Validatable, ValidatedJson, ValidationBuilder, Violation};
pub use gate::{Admission, Gate, GateState};
pub use rules::{Bound, FieldKind, FieldRule, RuleSet, UnknownFields};
