//! # Classroom Admission
//!
//! Request admission for the classroom API: the policies that bound how many
//! requests a caller may make, the verdicts a decision service returns, and an
//! in-process decision service.
//!
//! - [`policy`]: [`Policy`], [`Mode`], and the fixed per-role table
//! - [`verdict`]: [`Verdict`] and [`DenyReason`]
//! - [`decision`]: the [`DecisionService`] trait and [`RequestDetails`]
//! - [`local`]: [`LocalDecisionService`], shield + bot screening and keyed
//!   sliding-log rate limiting
//!
//! # Example
//!
//! ```ignore
//! use classroom_admission::{DecisionService, LocalDecisionService, Mode, Policy};
//! use classroom_core::Role;
//!
//! let service = LocalDecisionService::default();
//! let policy = Policy::for_role(Role::Teacher, Mode::Live);
//! let verdict = service.evaluate(&policy, &details).await?;
//! if verdict.is_denied() {
//!     // refuse the request
//! }
//! ```

pub mod bot;
pub mod decision;
pub mod local;
pub mod policy;
pub mod shield;
pub mod verdict;

pub use decision::{DecisionError, DecisionService, RequestDetails};
pub use local::{Detectors, LocalDecisionService};
pub use policy::{Mode, Policy, PolicyError, RoleLimit, WINDOW, role_limit};
pub use verdict::{DenyReason, Verdict};
