use image::RgbImage;

/// Generic default; activity classification passes its own looser threshold
#[cfg(test)]
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.95;

/// Compare two RGB images sample by sample.
///
/// Returns true when the fraction of identical channel samples is strictly
/// above `threshold`. Images of different size never match, and a buffer whose
/// length disagrees with its dimensions is a non-match rather than an error.
pub fn images_match(reference: &RgbImage, candidate: &RgbImage, threshold: f64) -> bool {
    if reference.dimensions() != candidate.dimensions() {
        return false;
    }

    let a = reference.as_raw();
    let b = candidate.as_raw();
    let expected = reference.width() as usize * reference.height() as usize * 3;
    if a.is_empty() || a.len() != expected || b.len() != expected {
        return false;
    }

    let equal = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    let fraction = equal as f64 / expected as f64;
    fraction > threshold
}
