//! # Controller
//!
//! Core reconciliation machinery shared by every resource kind.
//!
//! - `budget`: retry budget carried in the continuation token
//! - `diff`: keyed set diff for child collections
//! - `idempotency`: stable create tokens
//! - `reconciler`: the resumable create/update/delete driver

pub mod budget;
pub mod diff;
pub mod idempotency;
pub mod reconciler;
