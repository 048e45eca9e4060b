//! Vector fields for the supported compartmental models.
//!
//! Each model is a plain parameter struct implementing [`DynamicalSystem`] for any
//! [`Scalar`], so the same field can be driven by the fixed-step and adaptive
//! steppers alike. All models are autonomous: the time argument is ignored.
//!
//! [`DynamicalSystem`]: crate::traits::DynamicalSystem
//! [`Scalar`]: crate::traits::Scalar

mod seir;
mod sir;

pub use seir::{Seir, SeirParameters};
pub use sir::{Sir, SirParameters};
