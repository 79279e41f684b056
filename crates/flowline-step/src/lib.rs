//! Flowline Step
//!
//! The durable step capability executors use for anything with side effects.
//!
//! A step is a named unit of work. The runner behind the [`Step`] trait
//! remembers the output of every step that completed during a run, so running
//! the same name again returns the recorded output instead of repeating the
//! work. Failed work is re-invoked according to a [`RetryPolicy`] unless it
//! failed with [`StepError::NonRetriable`].
//!
//! [`DurableStep`] is the in-process runner. Its [`StepJournal`] is
//! serializable, so a failed run can be resumed later without redoing the
//! steps that already succeeded.

mod durable;
mod error;
mod journal;
mod policy;
mod step;

pub use durable::DurableStep;
pub use error::StepError;
pub use journal::StepJournal;
pub use policy::RetryPolicy;
pub use step::{ScopedStep, Step, StepFuture, StepWork};
