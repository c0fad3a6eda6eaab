use httpcodec_rt::hpack::huffman::MessageType;

// `EncodeBuffer` isn't re-exported at the crate root (it's an implementation
// detail of the HPACK path), so tests reach it through its module path.
use httpcodec_rt::encode_buffer::EncodeBuffer;

fn buf() -> EncodeBuffer {
    EncodeBuffer::new(64, MessageType::Request, false)
}

#[test]
fn integer_fits_in_prefix() {
    let mut b = buf();
    let n = b.append_integer(10, 5, 0x00);
    assert_eq!(n, 1);
    assert_eq!(b.take_flat(), vec![10]);
}

#[test]
fn integer_exactly_at_prefix_boundary_continues() {
    // 5-bit prefix maxes at 31; a value of 31 must NOT fit directly (RFC
    // 7541 §5.1's boundary is strict "<", not "<=").
    let mut b = buf();
    let n = b.append_integer(31, 5, 0x00);
    assert_eq!(n, 2);
    assert_eq!(b.take_flat(), vec![31, 0]);
}

#[test]
fn integer_requires_multiple_continuation_bytes() {
    let mut b = buf();
    // RFC 7541 §5.1 worked example: 1337 encoded with a 5-bit prefix.
    let n = b.append_integer(1337, 5, 0x00);
    assert_eq!(n, 3);
    assert_eq!(b.take_flat(), vec![31, 154, 10]);
}

#[test]
fn integer_prefix_byte_is_preserved_outside_the_low_bits() {
    let mut b = buf();
    b.append_integer(5, 4, 0xF0);
    assert_eq!(b.take_flat(), vec![0xF5]);
}

#[test]
fn literal_without_huffman_is_length_prefixed_raw_bytes() {
    let mut b = buf();
    let n = b.append_literal(b"abc");
    assert_eq!(n, 4);
    assert_eq!(b.take_flat(), vec![3, b'a', b'b', b'c']);
}

#[test]
fn literal_with_huffman_sets_the_high_bit_on_the_length_prefix() {
    let mut b = EncodeBuffer::new(64, MessageType::Request, true);
    b.append_literal(b"www.example.com");
    let out = b.take_flat();
    assert_eq!(out[0] & 0x80, 0x80, "huffman flag bit must be set");
}

#[test]
fn empty_literal_round_trips_to_a_single_zero_length_byte() {
    let mut b = buf();
    let n = b.append_literal(b"");
    assert_eq!(n, 1);
    assert_eq!(b.take_flat(), vec![0]);
}

#[test]
fn headroom_can_only_be_reserved_before_any_append() {
    let mut b = buf();
    b.reserve_headroom(9);
    assert_eq!(b.headroom_mut().len(), 9);
}

#[test]
#[should_panic]
fn reserving_headroom_after_appending_panics() {
    let mut b = buf();
    b.append_byte(1);
    b.reserve_headroom(4);
}

#[test]
fn ensure_capacity_allocates_a_new_segment_when_the_tail_is_full() {
    let mut b = EncodeBuffer::new(4, MessageType::Request, false);
    for i in 0..10u8 {
        b.append_byte(i);
    }
    assert_eq!(b.len(), 10);
    assert_eq!(b.take_flat(), (0..10u8).collect::<Vec<_>>());
}

#[test]
fn take_resets_the_buffer_to_empty() {
    let mut b = buf();
    b.append_byte(7);
    assert!(!b.is_empty());
    b.take();
    assert!(b.is_empty());
}
