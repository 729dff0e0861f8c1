pub mod data;
pub mod recommend;
pub mod report;
pub mod setup;
pub mod ui;
