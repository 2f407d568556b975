pub mod code;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod registry;
pub mod request;
pub mod room;
pub mod store;
pub mod user;

pub use coordinator::MembershipCoordinator;
pub use directory::IdentityDirectory;
pub use error::HearthError;
pub use ledger::RequestLedger;
pub use notify::{ChangeNotifier, Subscription};
pub use registry::{NewRoom, RoomRegistry};
pub use request::{FriendRequest, RequestStatus, RoomJoinRequest};
pub use room::{Room, RoomPatch};
pub use store::{Collection, DocumentStore, Filter, MemoryStore, StoreError, WriteOp};
pub use user::{User, UserPatch, UserProfile};
