//! Wire framing: CBOR payloads in, length-delimited CBOR payloads with a resync marker out.
//!
//! Commands arrive as a bare sequence of CBOR records on stdin — nothing separates one from the
//! next but the exact byte length CBOR's own encoding implies, so decoding just means asking for
//! one value at a time from the same reader. Replies go out the other direction prefixed with a
//! magic marker and an explicit `u32` length, so a reader losing sync partway through a stream
//! (or a stray diagnostic byte slipping onto the same descriptor) can still resynchronize on the
//! next marker.

use std::io::{self, BufRead, Write};

use crate::constants::MAGIC_PACKET_MARKER;
use crate::protocol::request::{Command, CommandProbe};
use crate::protocol::response::Reply;

/// Outcome of attempting to decode one command record.
pub enum DecodeOutcome {
    Command(Command),
    /// The record decoded as CBOR but its `Type` tag isn't one this agent recognizes.
    UnknownType { id: i64, ty: String },
    /// The record either isn't valid CBOR, or its `Type` is recognized but the rest of the shape
    /// doesn't match.
    Malformed { id: i64, detail: String },
}

/// Decodes one already-delimited CBOR payload into a [`DecodeOutcome`].
pub fn decode_command(bytes: &[u8]) -> DecodeOutcome {
    let value: ciborium::value::Value = match ciborium::de::from_reader(bytes) {
        Ok(value) => value,
        Err(err) => return DecodeOutcome::Malformed { id: 0, detail: err.to_string() },
    };

    let probe = value.deserialized::<CommandProbe>().unwrap_or_default();

    match value.deserialized::<Command>() {
        Ok(command) => DecodeOutcome::Command(command),
        Err(err) => {
            let id = probe.id.unwrap_or(0);
            match probe.ty {
                Some(ty) if !Command::is_known_type(&ty) => DecodeOutcome::UnknownType { id, ty },
                Some(_) => DecodeOutcome::Malformed { id, detail: err.to_string() },
                None => DecodeOutcome::Malformed { id, detail: err.to_string() },
            }
        }
    }
}

/// Serializes one reply to its bare CBOR payload, without framing.
pub fn encode_reply(reply: &Reply) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(reply, &mut buf)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
    Ok(buf)
}

/// Serializes one command to its bare CBOR payload, without framing — the same shape a
/// controller would write to this agent's stdin. Used by `--write` mode to capture a scripted
/// command sequence offline.
pub fn encode_command(command: &Command) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(command, &mut buf)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
    Ok(buf)
}

/// Pulls one CBOR record at a time off a buffered reader. Used on the input side, where records
/// are back-to-back with no framing of their own.
pub struct CommandReader<R> {
    reader: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next record, or `None` once the stream is cleanly exhausted between records.
    pub fn read_next(&mut self) -> io::Result<Option<DecodeOutcome>> {
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }
        let value: Result<ciborium::value::Value, _> = ciborium::de::from_reader(&mut self.reader);
        let outcome = match value {
            Ok(value) => {
                let probe = value.deserialized::<CommandProbe>().unwrap_or_default();
                match value.deserialized::<Command>() {
                    Ok(command) => DecodeOutcome::Command(command),
                    Err(err) => {
                        let id = probe.id.unwrap_or(0);
                        match probe.ty {
                            Some(ty) if !Command::is_known_type(&ty) => {
                                DecodeOutcome::UnknownType { id, ty }
                            }
                            _ => DecodeOutcome::Malformed { id, detail: err.to_string() },
                        }
                    }
                }
            }
            Err(err) => DecodeOutcome::Malformed { id: 0, detail: err.to_string() },
        };
        Ok(Some(outcome))
    }
}

/// Writes framed replies to a synchronous sink (stderr), flushing after every record so a reader
/// polling the descriptor never observes a partially written frame.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_reply(&mut self, reply: &Reply) -> io::Result<()> {
        let payload = encode_reply(reply)?;
        self.writer.write_all(MAGIC_PACKET_MARKER.as_bytes())?;
        self.writer.write_all(&(payload.len() as u32).to_be_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_known_command() {
        let mut buf = Vec::new();
        ciborium::into_writer(&Command::Ping { id: 1 }, &mut buf).unwrap();
        match decode_command(&buf) {
            DecodeOutcome::Command(Command::Ping { id }) => assert_eq!(id, 1),
            _ => panic!("expected Ping"),
        }
    }

    #[test]
    fn classifies_unrecognized_type_as_unknown() {
        let value = ciborium::value::Value::Map(vec![
            (
                ciborium::value::Value::Text("Type".into()),
                ciborium::value::Value::Text("levitate".into()),
            ),
            (
                ciborium::value::Value::Text("Id".into()),
                ciborium::value::Value::Integer(5.into()),
            ),
        ]);
        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf).unwrap();

        match decode_command(&buf) {
            DecodeOutcome::UnknownType { id, ty } => {
                assert_eq!(id, 5);
                assert_eq!(ty, "levitate");
            }
            _ => panic!("expected UnknownType"),
        }
    }

    #[test]
    fn classifies_malformed_cbor() {
        let buf = vec![0xff, 0x00, 0x01];
        match decode_command(&buf) {
            DecodeOutcome::Malformed { .. } => {}
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn command_reader_yields_sequential_records_then_none() {
        let mut bytes = Vec::new();
        ciborium::into_writer(&Command::Ping { id: 1 }, &mut bytes).unwrap();
        ciborium::into_writer(&Command::Exit { id: 2 }, &mut bytes).unwrap();
        let mut reader = CommandReader::new(Cursor::new(bytes));

        match reader.read_next().unwrap() {
            Some(DecodeOutcome::Command(Command::Ping { id: 1 })) => {}
            _ => panic!("expected first Ping record"),
        }
        match reader.read_next().unwrap() {
            Some(DecodeOutcome::Command(Command::Exit { id: 2 })) => {}
            _ => panic!("expected second Exit record"),
        }
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn frame_writer_prefixes_marker_and_length() {
        let mut out = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut out);
            writer.write_reply(&Reply::RemoveResult { id: 3 }).unwrap();
        }
        assert!(out.starts_with(MAGIC_PACKET_MARKER.as_bytes()));
        let len_offset = MAGIC_PACKET_MARKER.len();
        let len_bytes: [u8; 4] = out[len_offset..len_offset + 4].try_into().unwrap();
        let len = u32::from_be_bytes(len_bytes) as usize;
        assert_eq!(out.len(), len_offset + 4 + len);
    }
}
