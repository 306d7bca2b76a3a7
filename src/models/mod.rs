pub mod hiscore;
pub mod token;
