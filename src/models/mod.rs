pub mod achievement;
pub mod habit;
pub mod habit_log;
pub mod habit_template;
pub mod profile;
pub mod team;
pub mod team_member;
pub mod user_goal;
