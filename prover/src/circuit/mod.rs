pub mod distinct;
pub mod eddsa;
pub mod hash;
pub mod merkle;
pub mod poseidon;
pub mod range;
pub mod transition;
