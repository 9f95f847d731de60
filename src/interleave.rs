//! Channel Interleaver (C3): converts a block of `F` frames × `C` channels
//! between interleaved (channel-adjacent) and planar (channel-grouped)
//! layout.
//!
//! Grounded on the teacher's `samples::SampleBuffer`/`SampleBufferMut`
//! element-at-a-time indexing idiom, specialized to the one transform the
//! bridge needs: the driver always speaks interleaved, the bridge processes
//! planar internally.

/// Converts `buf` from interleaved (`c0f0, c1f0, …, c0f1, c1f1, …`) to
/// planar (`c0f0, c0f1, …, c1f0, c1f1, …`) layout in place, using `scratch`
/// as a one-block staging area.
///
/// `buf.len()` must be a multiple of `channels`; `scratch` is resized to
/// `buf.len()`.
pub fn deinterleave(buf: &mut [f64], channels: usize, scratch: &mut Vec<f64>) {
    debug_assert_eq!(buf.len() % channels, 0);
    if channels <= 1 {
        return;
    }
    let frames = buf.len() / channels;
    scratch.clear();
    scratch.resize(buf.len(), 0.0);
    for frame in 0..frames {
        for ch in 0..channels {
            scratch[ch * frames + frame] = buf[frame * channels + ch];
        }
    }
    buf.copy_from_slice(scratch);
}

/// Converts `buf` from planar to interleaved layout in place, using
/// `scratch` as a one-block staging area. The inverse of [`deinterleave`].
pub fn interleave(buf: &mut [f64], channels: usize, scratch: &mut Vec<f64>) {
    debug_assert_eq!(buf.len() % channels, 0);
    if channels <= 1 {
        return;
    }
    let frames = buf.len() / channels;
    scratch.clear();
    scratch.resize(buf.len(), 0.0);
    for ch in 0..channels {
        for frame in 0..frames {
            scratch[frame * channels + ch] = buf[ch * frames + frame];
        }
    }
    buf.copy_from_slice(scratch);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deinterleave_stereo() {
        let mut buf = vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let mut scratch = Vec::new();
        deinterleave(&mut buf, 2, &mut scratch);
        assert_eq!(buf, vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn interleave_is_inverse_of_deinterleave() {
        let original = vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let mut buf = original.clone();
        let mut scratch = Vec::new();
        deinterleave(&mut buf, 2, &mut scratch);
        interleave(&mut buf, 2, &mut scratch);
        assert_eq!(buf, original);
    }

    #[test]
    fn mono_is_a_no_op() {
        let mut buf = vec![1.0, 2.0, 3.0];
        let mut scratch = Vec::new();
        deinterleave(&mut buf, 1, &mut scratch);
        assert_eq!(buf, vec![1.0, 2.0, 3.0]);
    }
}
