/// `dst[i] ^= src[i]` over the shorter of the two.
pub fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= *s;
    }
}

#[test]
fn test_xor_in_place() {
    let mut a = [0xff_u8, 0x0f, 0x00];
    xor_in_place(&mut a, &[0x0f, 0x0f]);
    assert_eq!(a, [0xf0, 0x00, 0x00]);
}
