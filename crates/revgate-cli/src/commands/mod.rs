pub mod evaluate;
pub mod gate;
pub mod parse;
pub mod watch;
