// Weighted lottery: balancing target, probability engine, segment resolution.

pub mod balance;
pub mod probability;
pub mod segments;

pub use balance::ideal_rating;
pub use probability::{compute, explain, CandidateWeight, Distribution};
pub use segments::{build_segments, resolve, Segment, POSITION_DOMAIN};
