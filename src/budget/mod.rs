//! Stipend-to-weekly-budget derivation. Pure and stateless; persisting the
//! resulting allocations is up to the caller.

mod deriver;

pub use deriver::{derive, Allocation, BudgetError, Calculations, Derivation, Financials};
