pub mod dev_all;
pub mod run;
