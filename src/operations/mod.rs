pub mod add;
pub mod browse;
pub mod export;
pub mod view;
