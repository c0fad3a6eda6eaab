use httpcodec_rt::headers::HttpHeaders;
use httpcodec_rt::hpack::header_encoder::HeaderEncoder;
use httpcodec_rt::hpack::huffman::{self, MessageType};
use httpcodec_rt::hpack::wrapper::{Header, HpackDecoder, HpackEncoder};

#[test]
fn header_encoder_emits_literal_without_indexing_for_every_pair() {
    let mut headers = HttpHeaders::new();
    headers.add(":method", "GET");
    headers.add("accept", "*/*");

    let encoded = HeaderEncoder::new(MessageType::Request, false).encode(&headers);

    // Literal-without-indexing, new name: 0000 prefix nibble, index 0.
    assert_eq!(encoded[0] & 0xF0, 0x00);
    // Name length 7 (":method"), ASCII, not Huffman-coded.
    assert_eq!(encoded[1], 7);
    assert_eq!(&encoded[2..9], b":method");
}

#[test]
fn header_encoder_is_deterministic_for_the_same_input() {
    let mut headers = HttpHeaders::new();
    headers.add("x-a", "1");
    headers.add("x-b", "2");

    let encoder = HeaderEncoder::new(MessageType::Response, true);
    assert_eq!(encoder.encode(&headers), encoder.encode(&headers));
}

#[test]
fn header_encoder_never_reuses_a_name_across_pairs_as_an_index() {
    // Two headers sharing a name must each be encoded as a fresh literal,
    // never referencing an earlier occurrence — there is no indexing at all
    // on this path.
    let mut headers = HttpHeaders::new();
    headers.add("x-dup", "one");
    headers.add("x-dup", "two");

    let encoded = HeaderEncoder::new(MessageType::Request, false).encode(&headers);
    let occurrences = encoded.windows(5).filter(|w| *w == b"x-dup").count();
    assert_eq!(occurrences, 2);
}

#[test]
fn huffman_round_trips_arbitrary_ascii() {
    let table = huffman::table_for(MessageType::Request);
    let input = b"www.example.com/index.html";
    let encoded = table.encode(input);
    assert_eq!(encoded.len(), table.encoded_len(input));
    assert_eq!(table.decode(&encoded).unwrap(), input);
}

#[test]
fn huffman_decode_rejects_a_byte_with_no_matching_short_code() {
    let table = huffman::table_for(MessageType::Request);
    // No symbol in the canonical table has an 8-bit-or-shorter code of all
    // 1s, so a lone 0xFF byte leaves the trie walk mid-codepoint with 8
    // unresolved bits — too many to be valid EOS padding.
    assert!(table.decode(&[0xFF]).is_none());
}

#[test]
fn wire_hpack_round_trips_through_encoder_and_decoder() {
    let mut encoder = HpackEncoder::new();
    let mut decoder = HpackDecoder::new();

    let sent = vec![Header::new(":status", "200"), Header::new("content-type", "text/plain")];
    let wire = encoder.encode(&sent);
    let received = decoder.decode(&wire).expect("valid hpack block");

    assert_eq!(received, sent);
}

#[test]
fn wire_hpack_decoder_accepts_an_empty_block() {
    let mut decoder = HpackDecoder::new();
    assert_eq!(decoder.decode(&[]).unwrap(), Vec::new());
}
