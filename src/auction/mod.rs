pub mod auto_assign;
pub mod coordinator;
pub mod events;
pub mod messages;
pub mod state;

pub use coordinator::{AuctionCoordinator, CoordinatorHandle};
