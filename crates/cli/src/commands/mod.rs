pub mod doctor;
pub mod onboard;
pub mod send;
pub mod serve;
pub mod sessions;
