//! Scripted condition feeds and a manual clock for driving the engine in
//! tests.
//!
//! Enable with the `test-harness` feature:
//!
//! ```toml
//! [dev-dependencies]
//! witness = { version = "0.1", features = ["test-harness"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use witness::testing::ScriptedCondition;
//!
//! let mut verify = VerificationBuilder::new();
//! let condition = ScriptedCondition::new("web", "request received")
//!     .instance_at(ms(10), ms(10));
//! let probe = condition.probe();
//! let request = verify.condition(condition);
//!
//! verify.expect(|e| e.constraint(|c| c.condition(&request)))?;
//! let result = verify.build()?.verify().await?;
//!
//! assert!(result.expectations_met());
//! assert_eq!(probe.feeds_closed(), probe.feeds_built());
//! ```
//!
//! # Warning
//!
//! **Do not use in production.** Scripted feeds replay a fixed script and
//! never observe a live component.

mod broken_condition;
mod manual_clock;
mod probe;
mod scripted_condition;

pub use broken_condition::BrokenCondition;
pub use manual_clock::ManualClock;
pub use probe::FeedProbe;
pub use scripted_condition::ScriptedCondition;
