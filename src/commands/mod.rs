pub mod mining;
pub mod pools;
pub mod rank;
