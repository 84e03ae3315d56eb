pub mod app;
pub mod area;
pub mod confirm;
pub mod event;
pub mod picker;
mod popup;
pub mod ui;

pub use app::App;
