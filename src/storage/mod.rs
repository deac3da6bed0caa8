pub mod memory;
pub mod trait_def;

pub use memory::MemoryVisitStore;
pub use trait_def::VisitStore;
