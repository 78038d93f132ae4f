pub mod output;
pub mod reading;
pub mod run;
pub mod tuya;
