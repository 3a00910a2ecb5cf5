mod categories;
mod login;
mod password;
mod stats;
mod tracker;

pub use categories::CategoriesView;
pub use login::LoginView;
pub use password::PasswordView;
pub use stats::StatsView;
pub use tracker::TrackerView;
