pub mod artists;
pub mod songplays;
pub mod songs;
pub mod time;
pub mod users;
