/// Guess an image MIME type from its magic bytes; JPEG when unknown.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// File extension matching [`sniff_mime`].
pub fn art_extension(data: &[u8]) -> &'static str {
    match sniff_mime(data) {
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "jpg",
    }
}
