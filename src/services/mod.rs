pub mod assignment;
pub mod night;
pub mod session;
pub mod timer;
pub mod voting;
