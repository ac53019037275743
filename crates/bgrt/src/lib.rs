//! Binary Guided Random Testing over interval configurations.
//!
//! A configuration maps variable identifiers to closed intervals; the
//! BGRT state bisects and recombines the working configuration to
//! produce successor populations whose evaluation steers the search.
//!
//! # Key components
//!
//! - [`variable::Variable`]: a closed interval over shadow values with
//!   bisection, sampling, and pointwise arithmetic
//! - [`sampler::SamplerKind`]: the uniform-draw strategies
//! - [`state::BgrtState`]: the working configuration and its
//!   successor-population generator

pub mod sampler;
pub mod state;
pub mod variable;

pub use sampler::SamplerKind;
pub use state::{BgrtState, Configuration};
pub use variable::Variable;
