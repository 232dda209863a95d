pub mod checkin;
pub mod health;
pub mod index;
pub mod indexcss;
