pub mod fields;
pub mod frame;
pub mod message;
pub mod reply;

pub use fields::FieldMap;
pub use message::{fld_encode, Message, MessageEncoder, Origin, Separators};
pub use reply::{RawReply, Reply};
