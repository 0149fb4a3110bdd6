//! REST API handlers.

pub mod playlists;
pub mod posts;
pub mod queue;
pub mod system;
pub mod users;

pub use playlists::*;
pub use posts::*;
pub use queue::*;
pub use system::*;
pub use users::*;
