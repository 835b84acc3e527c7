pub mod remote;
pub mod replay;
