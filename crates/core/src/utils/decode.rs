use encoding_rs::{GBK, UTF_8};

/// Decode subprocess output.
///
/// The interpreter and the OS locale do not always agree on an output
/// encoding, so UTF-8 is tried first and GBK is used when UTF-8 decoding
/// produced replacement characters.
pub fn decode_output(bytes: &[u8]) -> String {
    let (text, _) = UTF_8.decode_without_bom_handling(bytes);
    if !text.contains('\u{FFFD}') {
        return text.into_owned();
    }

    tracing::debug!("Output is not valid UTF-8, decoding as GBK");
    let (text, _) = GBK.decode_without_bom_handling(bytes);
    text.into_owned()
}
