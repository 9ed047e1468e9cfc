pub mod consts;
pub mod edges;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod register;
pub mod segment;
pub mod ttp;
