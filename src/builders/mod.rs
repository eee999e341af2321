mod insert;

pub use insert::{Insert, InsertWithValues};
