/// Copies mono samples into every channel of an interleaved output buffer.
///
/// `output` is filled frame by frame; frames past the end of `mono` are
/// set to silence. Returns the number of frames taken from `mono`.
pub fn spread_mono_to_interleaved(output: &mut [f32], mono: &[f32], channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }

    let mut written = 0;
    for (frame_index, frame) in output.chunks_mut(channels).enumerate() {
        let sample = match mono.get(frame_index) {
            Some(sample) => {
                written += 1;
                *sample
            }
            None => 0.0,
        };
        frame.fill(sample);
    }
    written
}
