pub mod ecma48;
pub mod utils;
pub mod width;
