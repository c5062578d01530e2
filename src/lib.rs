pub mod lib {
    pub mod connection;
    pub mod error;
    pub mod loader;
    pub mod logging;
    pub mod template;
}
pub use lib::connection;
pub use lib::error;
pub use lib::loader;
pub use lib::logging;
pub use lib::template;
