pub mod api_error;
pub mod events;
pub mod wire;

pub use api_error::ApiError;
pub use events::{EventFrame, EventName, GameEnd, MoveUpdate, PushEvent};
pub use wire::{decode, encode, DecodeError, FromWire, ToWire};
