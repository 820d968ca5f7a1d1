pub mod control;
pub mod message;

pub use control::{
    cur_tick_message, encode_tick_message, next_tick_broadcasts, try_decode_tick_message,
    ControlError, TickMessage, TICK_MESSAGE_LENGTH,
};
pub use message::{IncomingMessage, OutgoingMessage, Protocol, RpcPerms};
