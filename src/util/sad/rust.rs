use std::num::NonZeroUsize;

#[must_use]
pub(super) fn get_sad(
    width: NonZeroUsize,
    height: NonZeroUsize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
    early_out: u32,
) -> u32 {
    match (width.get(), height.get()) {
        (4, 4) => get_sad_impl::<4, 4>(src, src_pitch, ref_, ref_pitch, early_out),
        (8, 4) => get_sad_impl::<8, 4>(src, src_pitch, ref_, ref_pitch, early_out),
        (8, 8) => get_sad_impl::<8, 8>(src, src_pitch, ref_, ref_pitch, early_out),
        (8, 16) => get_sad_impl::<8, 16>(src, src_pitch, ref_, ref_pitch, early_out),
        (16, 8) => get_sad_impl::<16, 8>(src, src_pitch, ref_, ref_pitch, early_out),
        (16, 16) => get_sad_impl::<16, 16>(src, src_pitch, ref_, ref_pitch, early_out),
        _ => unimplemented!("Invalid block size for SAD"),
    }
}

#[must_use]
fn get_sad_impl<const WIDTH: usize, const HEIGHT: usize>(
    src: &[u8],
    src_pitch: NonZeroUsize,
    ref_: &[u8],
    ref_pitch: NonZeroUsize,
    early_out: u32,
) -> u32 {
    let mut sum = 0u32;
    for y in 0..HEIGHT {
        sum += row_sad::<WIDTH>(
            &src[y * src_pitch.get()..][..WIDTH],
            &ref_[y * ref_pitch.get()..][..WIDTH],
        );
        if sum > early_out {
            return sum;
        }
    }
    sum
}

#[inline]
#[must_use]
fn row_sad<const WIDTH: usize>(src_row: &[u8], ref_row: &[u8]) -> u32 {
    src_row
        .iter()
        .zip(ref_row.iter())
        .fold(0, |acc, (&s, &r)| acc + s.abs_diff(r) as u32)
}

#[must_use]
pub(super) fn get_sad_multi<const N: usize>(
    width: NonZeroUsize,
    height: NonZeroUsize,
    src: &[u8],
    src_pitch: NonZeroUsize,
    refs: [&[u8]; N],
    ref_pitch: NonZeroUsize,
) -> [u32; N] {
    match (width.get(), height.get()) {
        (4, 4) => get_sad_multi_impl::<N, 4, 4>(src, src_pitch, refs, ref_pitch),
        (8, 4) => get_sad_multi_impl::<N, 8, 4>(src, src_pitch, refs, ref_pitch),
        (8, 8) => get_sad_multi_impl::<N, 8, 8>(src, src_pitch, refs, ref_pitch),
        (8, 16) => get_sad_multi_impl::<N, 8, 16>(src, src_pitch, refs, ref_pitch),
        (16, 8) => get_sad_multi_impl::<N, 16, 8>(src, src_pitch, refs, ref_pitch),
        (16, 16) => get_sad_multi_impl::<N, 16, 16>(src, src_pitch, refs, ref_pitch),
        _ => unimplemented!("Invalid block size for SAD"),
    }
}

#[must_use]
fn get_sad_multi_impl<const N: usize, const WIDTH: usize, const HEIGHT: usize>(
    src: &[u8],
    src_pitch: NonZeroUsize,
    refs: [&[u8]; N],
    ref_pitch: NonZeroUsize,
) -> [u32; N] {
    let mut sums = [0u32; N];
    for y in 0..HEIGHT {
        let src_row = &src[y * src_pitch.get()..][..WIDTH];
        for (sum, ref_) in sums.iter_mut().zip(refs.iter()) {
            *sum += row_sad::<WIDTH>(src_row, &ref_[y * ref_pitch.get()..][..WIDTH]);
        }
    }
    sums
}
