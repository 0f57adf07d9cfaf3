pub mod basis;
pub mod relax;
