pub mod frame;

pub use frame::{decode_command, encode_command, encode_reply, CommandReader, DecodeOutcome, FrameWriter};
