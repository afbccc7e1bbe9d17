//! Tag block access: reading via `lofty`, ID3 rewriting via `id3`.

mod art;
mod read;
mod write;

pub use art::art_extension;
pub use read::read_tags;
pub use write::{TrackEdit, write_id3};

/// 200 silent MPEG-1 Layer III frames (128 kbit/s, 44.1 kHz), about 5.2 s.
#[cfg(test)]
pub(crate) fn mpeg_stream() -> Vec<u8> {
    let mut frame = vec![0xFF, 0xFB, 0x90, 0x64];
    frame.resize(417, 0);
    frame.repeat(200)
}
