pub mod feedback;
pub mod orders;
