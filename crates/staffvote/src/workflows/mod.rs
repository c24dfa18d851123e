pub mod attendance;
pub mod governance;
