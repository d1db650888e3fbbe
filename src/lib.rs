#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Witness
//!
//! Declare time-ordered expectations against a live environment and verify
//! they actually occur.
//!
//! Witness is the verification half of a mock-driven test: components
//! (request stubs, identity-provider stubs, process hosts) report
//! "condition occurred" events through asynchronous feeds, and Witness
//! merges those feeds into a single chronological sequence, evaluates it
//! against time-windowed constraints, and races the evaluation against
//! per-constraint deadlines and a global inactivity timeout.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use witness::VerificationBuilder;
//!
//! # async fn run(server: impl Fn(&str) -> MySpec, idp: impl Fn(&str) -> MySpec) -> witness::Result {
//! let mut verify = VerificationBuilder::new();
//! verify.inactivity_timeout(Duration::from_secs(5));
//!
//! // Register what the components can report...
//! let request = verify.condition(server("/token"));
//! let audit = verify.condition(idp("TokenIssued"));
//!
//! // ...declare what must happen, and in what order...
//! verify.expect(|e| {
//!     e.constraint(|c| c.condition(&request).before(Duration::from_millis(150)))
//!         .then(|g| g.constraint(|c| c.condition(&audit).before(Duration::from_millis(500))))
//! })?;
//!
//! // ...then run it.
//! let result = verify.build()?.verify().await?;
//! assert!(result.expectations_met());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`VerificationBuilder`] | Registers conditions and declares expectations |
//! | [`Verifier`] | Runs every expectation to a verdict |
//! | [`ConditionSpecification`] | Implemented by components; builds a feed per run |
//! | [`ConditionFeed`] | Live asynchronous source of condition instances |
//! | [`ConditionId`] | Identifies a registered condition |
//! | [`ConditionInstance`] | One timestamped occurrence of a condition |
//! | [`InstanceFactory`] | Stamps occurrences relative to the run's start |
//! | [`Outcome`] | Tri-state verdict: undetermined, met, not met |
//! | [`VerificationResult`] | Aggregate verdict plus per-expectation results |
//!
//! ## Timing Model
//!
//! Every occurrence is stamped with its offset from the moment verification
//! started, never with wall-clock time, so constraints read as offsets:
//! `after(t)`, `before(t)`, `between(t1, t2)`. Instances from independent
//! feeds are merged and delivered to the evaluation tree in chronological
//! order, whichever feed physically reported first.
//!
//! A run ends when every expectation reaches a verdict, when the inactivity
//! timeout passes with nothing new to evaluate, or when it is cancelled.
//! Expectations that fail a window produce a normal
//! [`ExpectationResult`]; only infrastructure faults (feed build failure,
//! cancellation) surface as errors.
//!
//! ## Features
//!
//! - **`serde`** - JSON export of results (e.g. [`VerificationResult::to_json()`])
//! - **`test-harness`** - Scripted condition feeds and a manual clock for tests
//!
//! ## Demos
//!
//! See the `demos/` directory:
//!
//! - `verify.rs` - End-to-end verification against simulated components
//! - `short_circuit.rs` - Failing fast across several expectations

mod clock;
mod condition_id;
mod condition_instance;
mod constraint;
mod error;
mod expectation;
mod feed;
mod feed_instance;
mod instance_factory;
mod outcome;
mod result;
mod verification_builder;
mod verifier;

mod internal;

#[cfg(any(test, feature = "test-harness"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-harness")))]
pub mod testing;

pub use clock::{Clock, MonotonicClock};
pub use condition_id::ConditionId;
pub use condition_instance::ConditionInstance;
pub use constraint::ConstraintBuilder;
pub use error::Error;
pub use expectation::ExpectationBuilder;
pub use feed::{ConditionFeed, ConditionSpecification};
pub use feed_instance::FeedInstance;
pub use instance_factory::InstanceFactory;
pub use outcome::Outcome;
pub use result::{ExpectationResult, VerificationResult};
pub use verification_builder::VerificationBuilder;
pub use verifier::Verifier;

/// Convenience alias for `Result<T, witness::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
