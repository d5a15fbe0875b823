//! The signing stages: SingleHash → MultiHash → CombineResults

mod combine;
mod multi_hash;
mod single_hash;
mod workers;

pub use combine::{COMBINE_SEPARATOR, CombineResults, combine};
pub use multi_hash::{MULTI_HASH_ROUNDS, MultiHash};
pub use single_hash::SingleHash;
pub use workers::DEFAULT_MAX_IN_FLIGHT;

use crate::pipeline::Stage;
use crate::signer::SigningContext;

/// The standard three-stage signing pipeline sharing one signing context.
pub fn signing_stages(ctx: &SigningContext) -> Vec<Box<dyn Stage>> {
    bounded_signing_stages(ctx, DEFAULT_MAX_IN_FLIGHT)
}

/// Like [`signing_stages`], with each hashing stage signing at most
/// `max_in_flight` items at once.
pub fn bounded_signing_stages(ctx: &SigningContext, max_in_flight: usize) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(SingleHash::new(ctx.clone()).with_max_in_flight(max_in_flight)),
        Box::new(MultiHash::new(ctx.clone()).with_max_in_flight(max_in_flight)),
        Box::new(CombineResults),
    ]
}
