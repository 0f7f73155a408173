pub mod activity;
pub mod events;
pub mod health;
pub mod leaderboard;
pub mod xp;
