//! `taskbell`: terminal task manager with due-date reminders.

pub mod clock;
pub mod commands;
pub mod config;
pub mod notify;
pub mod reminder;
pub mod store;
pub mod view;
